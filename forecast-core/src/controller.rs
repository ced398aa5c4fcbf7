//! Lifecycle of the forecast request and the state the screen renders.
//!
//! The controller is the only writer of [`FetchState`]; presentation code
//! observes it through [`ForecastController::subscribe`].

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::{
    FetchError, FetchFailure,
    model::{Forecast, Location},
    provider::ForecastProvider,
};

/// Why the controller is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadKind {
    /// First load after start; nothing has been shown yet.
    Initial,
    /// User-requested refresh.
    Refresh,
}

/// The one thing the screen shows at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FetchState {
    Loading(LoadKind),
    Error(FetchFailure),
    Loaded(Forecast),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading(_))
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            FetchState::Loaded(forecast) => Some(forecast),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded,
    Failed,
    /// A fetch was already in flight; nothing was started.
    Ignored,
}

/// Messages accepted by [`ForecastController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Shutdown,
}

/// Extra attempts after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct ForecastController {
    provider: Box<dyn ForecastProvider>,
    location: Location,
    retry: RetryPolicy,
    state: watch::Sender<FetchState>,
    in_flight: Mutex<()>,
}

impl ForecastController {
    /// The controller starts out in `Loading(Initial)`; call [`load`](Self::load)
    /// or [`run`](Self::run) to issue the first fetch.
    pub fn new(provider: Box<dyn ForecastProvider>, location: Location) -> Self {
        let (state, _) = watch::channel(FetchState::Loading(LoadKind::Initial));
        Self { provider, location, retry: RetryPolicy::default(), state, in_flight: Mutex::new(()) }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    pub async fn load(&self) -> RefreshOutcome {
        self.fetch_and_settle(LoadKind::Initial).await
    }

    /// Re-enter `Loading` and fetch again, unless a fetch is already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.fetch_and_settle(LoadKind::Refresh).await
    }

    /// Perform the initial load, then serve commands until `Shutdown` or until
    /// every sender is dropped.
    ///
    /// Refresh commands that arrive while a fetch is in flight are dropped.
    /// `Shutdown` cancels an in-flight fetch and leaves the state in `Error`.
    pub async fn run(&self, mut commands: mpsc::Receiver<Command>) {
        let mut pending = Some(LoadKind::Initial);

        loop {
            if let Some(kind) = pending.take() {
                let settle = self.fetch_and_settle(kind);
                tokio::pin!(settle);

                loop {
                    tokio::select! {
                        _ = &mut settle => break,
                        cmd = commands.recv() => match cmd {
                            Some(Command::Refresh) => {
                                debug!("refresh ignored, fetch already in flight");
                            }
                            Some(Command::Shutdown) | None => {
                                info!("controller stopped during fetch");
                                self.state.send_replace(FetchState::Error(FetchFailure::cancelled()));
                                return;
                            }
                        },
                    }
                }
            }

            match commands.recv().await {
                Some(Command::Refresh) => pending = Some(LoadKind::Refresh),
                Some(Command::Shutdown) | None => {
                    info!("controller stopped");
                    return;
                }
            }
        }
    }

    async fn fetch_and_settle(&self, kind: LoadKind) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!(?kind, "fetch already in flight");
            return RefreshOutcome::Ignored;
        };

        self.state.send_replace(FetchState::Loading(kind));
        info!(?kind, location = self.location.name, "loading forecast");

        match self.fetch_with_retry().await {
            Ok(forecast) => {
                info!(days = forecast.daily.days().len(), "forecast loaded");
                self.state.send_replace(FetchState::Loaded(forecast));
                RefreshOutcome::Loaded
            }
            Err(err) => {
                error!(error = %err, "weather fetch failed");
                self.state.send_replace(FetchState::Error(FetchFailure::from(&err)));
                RefreshOutcome::Failed
            }
        }
    }

    async fn fetch_with_retry(&self) -> Result<Forecast, FetchError> {
        let mut attempt = 0;
        loop {
            match self.provider.fetch(&self.location).await {
                Err(err) if err.is_transient() && attempt < self.retry.attempts => {
                    attempt += 1;
                    warn!(
                        error = %err,
                        attempt,
                        max_attempts = self.retry.attempts,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::{error::FailureKind, model::fixtures};

    /// Replays scripted results, one per fetch.
    #[derive(Debug, Default)]
    struct Scripted {
        results: std::sync::Mutex<VecDeque<Result<Forecast, FetchError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(results: Vec<Result<Forecast, FetchError>>) -> Self {
            Self { results: std::sync::Mutex::new(results.into()), calls: Arc::default() }
        }
    }

    #[async_trait]
    impl ForecastProvider for Scripted {
        async fn fetch(&self, _location: &Location) -> Result<Forecast, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Schema("script exhausted".into())))
        }
    }

    /// Blocks every fetch until released.
    #[derive(Debug)]
    struct Gated {
        started: Arc<Notify>,
        release: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ForecastProvider for Gated {
        async fn fetch(&self, _location: &Location) -> Result<Forecast, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(fixtures::forecast())
        }
    }

    fn server_error() -> FetchError {
        FetchError::HttpStatus { code: 503, body: "busy".into() }
    }

    fn controller(results: Vec<Result<Forecast, FetchError>>) -> ForecastController {
        ForecastController::new(Box::new(Scripted::new(results)), Location::LUDHIANA)
    }

    #[test]
    fn starts_in_initial_loading() {
        let ctrl = controller(vec![]);
        assert_eq!(ctrl.state(), FetchState::Loading(LoadKind::Initial));
        assert_eq!(ctrl.location(), &Location::LUDHIANA);
    }

    #[tokio::test]
    async fn successful_load_reaches_loaded() {
        let ctrl = controller(vec![Ok(fixtures::forecast())]);

        assert_eq!(ctrl.load().await, RefreshOutcome::Loaded);

        let state = ctrl.state();
        let forecast = state.forecast().expect("loaded");
        assert_eq!(forecast.daily.days().len(), 7);
    }

    #[tokio::test]
    async fn failed_load_reaches_error() {
        let ctrl = controller(vec![Err(FetchError::Schema("daily arrays misaligned".into()))]);

        assert_eq!(ctrl.load().await, RefreshOutcome::Failed);

        match ctrl.state() {
            FetchState::Error(failure) => {
                assert_eq!(failure.kind, FailureKind::Schema);
                assert_eq!(failure.user_message(), FetchFailure::USER_MESSAGE);
            }
            other => panic!("expected error state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_replaces_previous_state() {
        let ctrl = controller(vec![Err(server_error()), Ok(fixtures::forecast())]);
        let mut states = ctrl.subscribe();

        ctrl.load().await;
        assert!(matches!(ctrl.state(), FetchState::Error(_)));
        states.borrow_and_update();

        assert_eq!(ctrl.refresh().await, RefreshOutcome::Loaded);
        assert!(states.has_changed().unwrap());
        assert!(ctrl.state().forecast().is_some());
    }

    #[tokio::test]
    async fn refresh_after_loaded_can_fail() {
        let ctrl = controller(vec![Ok(fixtures::forecast()), Err(server_error())]);

        ctrl.load().await;
        assert_eq!(ctrl.refresh().await, RefreshOutcome::Failed);
        assert!(ctrl.state().forecast().is_none());
    }

    #[tokio::test]
    async fn retries_transient_failures_within_budget() {
        let provider =
            Scripted::new(vec![Err(server_error()), Err(server_error()), Ok(fixtures::forecast())]);
        let calls = provider.calls.clone();
        let ctrl = ForecastController::new(Box::new(provider), Location::LUDHIANA)
            .with_retry(RetryPolicy { attempts: 2, delay: Duration::from_millis(1) });

        assert_eq!(ctrl.load().await, RefreshOutcome::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_schema_errors() {
        let provider = Scripted::new(vec![
            Err(FetchError::Schema("bad".into())),
            Ok(fixtures::forecast()),
        ]);
        let calls = provider.calls.clone();
        let ctrl = ForecastController::new(Box::new(provider), Location::LUDHIANA)
            .with_retry(RetryPolicy { attempts: 3, delay: Duration::from_millis(1) });

        assert_eq!(ctrl.load().await, RefreshOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let provider = Scripted::new(vec![Err(server_error()), Ok(fixtures::forecast())]);
        let calls = provider.calls.clone();
        let ctrl = ForecastController::new(Box::new(provider), Location::LUDHIANA);

        assert_eq!(ctrl.load().await, RefreshOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_while_in_flight_is_ignored() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctrl = Arc::new(ForecastController::new(
            Box::new(Gated { started: started.clone(), release: release.clone(), calls: calls.clone() }),
            Location::LUDHIANA,
        ));

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.load().await }
        });
        started.notified().await;

        assert_eq!(ctrl.refresh().await, RefreshOutcome::Ignored);
        assert_eq!(ctrl.state(), FetchState::Loading(LoadKind::Initial));

        release.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Loaded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_drops_refresh_commands_during_fetch() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctrl = Arc::new(ForecastController::new(
            Box::new(Gated { started: started.clone(), release: release.clone(), calls: calls.clone() }),
            Location::LUDHIANA,
        ));
        let mut states = ctrl.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.run(rx).await }
        });

        started.notified().await;
        tx.send(Command::Refresh).await.unwrap();
        tx.send(Command::Refresh).await.unwrap();
        while tx.capacity() < 8 {
            tokio::task::yield_now().await;
        }

        release.notify_one();
        states.wait_for(|s| !s.is_loading()).await.unwrap();

        tx.send(Command::Shutdown).await.unwrap();
        task.await.unwrap();

        assert!(ctrl.state().forecast().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_serves_refresh_after_settle() {
        let ctrl = Arc::new(controller(vec![Err(server_error()), Ok(fixtures::forecast())]));
        let mut states = ctrl.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.run(rx).await }
        });

        states.wait_for(|s| matches!(s, FetchState::Error(_))).await.unwrap();

        tx.send(Command::Refresh).await.unwrap();
        states.wait_for(|s| s.forecast().is_some()).await.unwrap();

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn run_shutdown_mid_fetch_settles() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctrl = Arc::new(ForecastController::new(
            Box::new(Gated { started: started.clone(), release, calls }),
            Location::LUDHIANA,
        ));
        let mut states = ctrl.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.run(rx).await }
        });

        started.notified().await;
        tx.send(Command::Shutdown).await.unwrap();
        task.await.unwrap();

        match ctrl.state() {
            FetchState::Error(failure) => assert_eq!(failure.kind, FailureKind::Cancelled),
            other => panic!("expected cancelled error, got {other:?}"),
        }

        let settled = tokio::time::timeout(
            Duration::from_millis(200),
            states.wait_for(|s| !s.is_loading()),
        )
        .await;
        assert!(matches!(settled, Ok(Ok(_))));
    }
}
