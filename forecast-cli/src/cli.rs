use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use forecast_core::{
    Command as ControllerCommand, Config, FetchFailure, FetchState, ForecastController, Location,
    provider_from_config,
};
use inquire::{CustomType, InquireError, Select, Text};
use tokio::sync::mpsc;
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Current weather and 7-day forecast for Ludhiana")]
pub struct Cli {
    /// Log at debug level regardless of RUST_LOG or the config file.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch once and print the forecast.
    Show {
        /// Print the loaded forecast as JSON instead of the text screen.
        #[arg(long)]
        json: bool,
    },

    /// Show the forecast and offer to refresh it until you quit.
    Watch,

    /// List the weather codes with their icons and descriptions.
    Codes,

    /// Edit the provider, retry and logging settings.
    Configure,
}

impl Cli {
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        match self.command {
            Command::Show { json } => show(&config, json).await,
            Command::Watch => watch(&config).await,
            Command::Codes => {
                print!("{}", render::codes());
                Ok(())
            }
            Command::Configure => configure(config),
        }
    }
}

fn build_controller(config: &Config) -> anyhow::Result<ForecastController> {
    let provider = provider_from_config(config)?;
    Ok(ForecastController::new(provider, Location::LUDHIANA).with_retry(config.retry_policy()))
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

async fn show(config: &Config, json: bool) -> anyhow::Result<()> {
    let controller = build_controller(config)?;

    eprint!("{}", render::screen(&controller.state(), controller.location(), today()));
    controller.load().await;

    let state = controller.state();
    match (&state, json) {
        (FetchState::Loaded(forecast), true) => {
            let out = serde_json::to_string_pretty(forecast).context("Failed to serialize forecast")?;
            println!("{out}");
        }
        (FetchState::Error(failure), _) => {
            eprint!("{}", render::screen(&state, controller.location(), today()));
            return Err(anyhow!("{}", failure.user_message()));
        }
        _ => print!("{}", render::screen(&state, controller.location(), today())),
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    Quit,
}

fn prompt_action() -> anyhow::Result<Action> {
    match Select::new("What next?", vec!["Refresh", "Quit"]).prompt() {
        Ok("Refresh") => Ok(Action::Refresh),
        Ok(_) => Ok(Action::Quit),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(Action::Quit),
        Err(e) => Err(e).context("Failed to read selection"),
    }
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    let controller = Arc::new(build_controller(config)?);
    let mut states = controller.subscribe();
    let (tx, rx) = mpsc::channel(4);

    let runner = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.run(rx).await }
    });

    print!("{}", render::screen(&controller.state(), controller.location(), today()));

    loop {
        let state = states
            .wait_for(|s| !s.is_loading())
            .await
            .context("Forecast controller stopped unexpectedly")?
            .clone();

        print!("{}", render::screen(&state, controller.location(), today()));
        if let FetchState::Error(failure) = &state {
            notify(failure);
        }

        let action = tokio::task::spawn_blocking(prompt_action)
            .await
            .context("Prompt task panicked")??;
        debug!(?action, "user action");

        match action {
            Action::Refresh => {
                tx.send(ControllerCommand::Refresh)
                    .await
                    .context("Forecast controller stopped unexpectedly")?;
                // Wait for the controller to leave the settled state we just rendered.
                states.changed().await.context("Forecast controller stopped unexpectedly")?;
                let current = states.borrow_and_update().clone();
                // A fast fetch may already have settled; the loop renders that.
                if let Some(text) = render::refreshing(&current, controller.location(), today()) {
                    print!("{text}");
                }
            }
            Action::Quit => break,
        }
    }

    let _ = tx.send(ControllerCommand::Shutdown).await;
    runner.await.context("Forecast controller task panicked")?;
    Ok(())
}

fn notify(failure: &FetchFailure) {
    eprintln!("Error: {}", failure.user_message());
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let base_url = Text::new("Provider URL:")
        .with_default(&config.provider.base_url)
        .prompt()
        .context("Failed to read provider URL")?;
    config.provider.base_url = base_url;

    config.provider.timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.provider.timeout_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()
        .context("Failed to read timeout")?;

    config.retry.attempts = CustomType::<u32>::new("Extra attempts after a transient failure:")
        .with_default(config.retry.attempts)
        .with_error_message("Please enter a whole number")
        .prompt()
        .context("Failed to read retry attempts")?;

    if config.retry.attempts > 0 {
        config.retry.delay_ms = CustomType::<u64>::new("Delay between attempts (ms):")
            .with_default(config.retry.delay_ms)
            .with_error_message("Please enter a whole number of milliseconds")
            .prompt()
            .context("Failed to read retry delay")?;
    }

    let filter = Text::new("Log filter:")
        .with_default(&config.log.filter)
        .prompt()
        .context("Failed to read log filter")?;
    config.log.filter = filter;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}
