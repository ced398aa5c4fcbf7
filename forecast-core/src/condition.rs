//! WMO weather-interpretation codes mapped to icons and descriptions.
//!
//! See: https://open-meteo.com/en/docs#weathervariables

use serde::{Deserialize, Serialize};

/// Icon shown for codes missing from [`CONDITIONS`].
pub const FALLBACK_ICON: &str = "🌤️";

/// Description shown for codes missing from [`CONDITIONS`].
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub code: i32,
    pub description: &'static str,
    pub day_icon: &'static str,
    pub night_icon: &'static str,
}

impl Condition {
    const fn new(code: i32, description: &'static str, icon: &'static str) -> Self {
        Self { code, description, day_icon: icon, night_icon: icon }
    }

    const fn day_night(
        code: i32,
        description: &'static str,
        day_icon: &'static str,
        night_icon: &'static str,
    ) -> Self {
        Self { code, description, day_icon, night_icon }
    }

    pub fn icon(&self, is_day: bool) -> &'static str {
        if is_day { self.day_icon } else { self.night_icon }
    }
}

/// Every code the provider is known to emit, sorted by code.
pub const CONDITIONS: &[Condition] = &[
    Condition::day_night(0, "Clear sky", "☀️", "🌙"),
    Condition::day_night(1, "Mainly clear", "🌤️", "🌙"),
    Condition::new(2, "Partly cloudy", "⛅"),
    Condition::new(3, "Overcast", "☁️"),
    Condition::new(45, "Fog", "🌫️"),
    Condition::new(48, "Depositing rime fog", "🌫️"),
    Condition::new(51, "Light drizzle", "🌦️"),
    Condition::new(53, "Moderate drizzle", "🌦️"),
    Condition::new(55, "Dense drizzle", "🌦️"),
    Condition::new(61, "Slight rain", "🌧️"),
    Condition::new(63, "Moderate rain", "🌧️"),
    Condition::new(65, "Heavy rain", "🌧️"),
    Condition::new(71, "Slight snow fall", "🌨️"),
    Condition::new(73, "Moderate snow fall", "🌨️"),
    Condition::new(75, "Heavy snow fall", "🌨️"),
    Condition::new(77, "Snow grains", "🌨️"),
    Condition::new(80, "Slight rain showers", "🌦️"),
    Condition::new(81, "Moderate rain showers", "🌦️"),
    Condition::new(82, "Violent rain showers", "🌦️"),
    Condition::new(85, "Slight snow showers", "🌨️"),
    Condition::new(86, "Heavy snow showers", "🌨️"),
    Condition::new(95, "Thunderstorm", "⛈️"),
    Condition::new(96, "Thunderstorm with slight hail", "⛈️"),
    Condition::new(99, "Thunderstorm with heavy hail", "⛈️"),
];

pub fn lookup(code: i32) -> Option<&'static Condition> {
    CONDITIONS
        .binary_search_by_key(&code, |c| c.code)
        .ok()
        .map(|idx| &CONDITIONS[idx])
}

/// Icon for `code`; only clear and mainly-clear skies have a night variant.
pub fn icon(code: i32, is_day: bool) -> &'static str {
    lookup(code).map_or(FALLBACK_ICON, |c| c.icon(is_day))
}

pub fn description(code: i32) -> &'static str {
    lookup(code).map_or(UNKNOWN_DESCRIPTION, |c| c.description)
}

/// Raw weather code as reported by the provider.
///
/// Any integer is representable; unknown codes degrade to the fallback icon
/// and the `"Unknown"` description instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherCode(pub i32);

impl WeatherCode {
    pub fn icon(self, is_day: bool) -> &'static str {
        icon(self.0, is_day)
    }

    pub fn description(self) -> &'static str {
        description(self.0)
    }

    pub fn is_known(self) -> bool {
        lookup(self.0).is_some()
    }
}

impl From<i32> for WeatherCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}
