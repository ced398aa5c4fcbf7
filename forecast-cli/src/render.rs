use chrono::NaiveDate;
use forecast_core::{
    FetchState, LoadKind, Location,
    condition::CONDITIONS,
    view::{ERROR_TEXT, FORECAST_TITLE, ForecastView, LOADING_TEXT},
};

/// Text shown for `state`, one screen at a time.
pub fn screen(state: &FetchState, location: &Location, today: NaiveDate) -> String {
    match state {
        FetchState::Loading(LoadKind::Initial) => format!("{LOADING_TEXT}\n"),
        FetchState::Loading(LoadKind::Refresh) => "Refreshing...\n".to_string(),
        FetchState::Error(_) => format!("{ERROR_TEXT}\n"),
        FetchState::Loaded(forecast) => loaded(&ForecastView::new(forecast, location, today)),
    }
}

/// Screen for a refresh that is still running, `None` once it has settled.
pub fn refreshing(state: &FetchState, location: &Location, today: NaiveDate) -> Option<String> {
    state.is_loading().then(|| screen(state, location, today))
}

fn loaded(view: &ForecastView) -> String {
    let mut lines = vec![
        view.location.to_string(),
        view.date_heading.clone(),
        String::new(),
        format!("{}  {}", view.current.icon, view.current.temperature),
        view.current.description.to_string(),
        view.current.feels_like.clone(),
        String::new(),
    ];

    lines.extend(view.details.iter().map(|d| format!("{:<20}{}", d.label, d.value)));
    lines.push(String::new());

    lines.push(FORECAST_TITLE.to_string());
    lines.extend(view.days.iter().map(|day| {
        format!(
            "{:<12}{}  {:<32}{:>5}{:>5}",
            day.label, day.icon, day.description, day.high, day.low
        )
    }));

    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// The classification table, one code per line.
pub fn codes() -> String {
    CONDITIONS
        .iter()
        .map(|c| {
            let icons = if c.day_icon == c.night_icon {
                c.day_icon.to_string()
            } else {
                format!("{} / {}", c.day_icon, c.night_icon)
            };
            format!("{:>3}  {:<8}{}\n", c.code, icons, c.description)
        })
        .collect()
}
