//! Rendering of bar text and Pango-markup tooltip.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use barcast_core::TemperatureUnit;

use crate::types::{
    BarOutput, ConditionText, ForecastDay, ForecastPayload, LocationRecord, WeatherCondition,
};

const MAX_HOURS: usize = 12;
const MAX_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Celsius,
    Fahrenheit,
}

impl Scale {
    fn pick(self, celsius: f64, fahrenheit: f64) -> i64 {
        let value = match self {
            Scale::Celsius => celsius,
            Scale::Fahrenheit => fahrenheit,
        };
        value.round() as i64
    }

    fn other(self) -> Self {
        match self {
            Scale::Celsius => Scale::Fahrenheit,
            Scale::Fahrenheit => Scale::Celsius,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Scale::Celsius => "°C",
            Scale::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    unit: TemperatureUnit,
}

impl Formatter {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self { unit }
    }

    fn scale_for(&self, location: &LocationRecord) -> Scale {
        match self.unit {
            TemperatureUnit::Celsius => Scale::Celsius,
            TemperatureUnit::Fahrenheit => Scale::Fahrenheit,
            TemperatureUnit::Auto if location.in_united_states() => Scale::Fahrenheit,
            TemperatureUnit::Auto => Scale::Celsius,
        }
    }

    /// Render whatever is available; missing inputs produce a degraded pair.
    pub fn format(
        &self,
        location: Option<&LocationRecord>,
        forecast: Option<&ForecastPayload>,
        now: NaiveDateTime,
    ) -> BarOutput {
        match (location, forecast) {
            (None, _) => BarOutput::location_unavailable(),
            (Some(_), None) => BarOutput::weather_unavailable(None),
            (Some(location), Some(forecast)) => self.format_weather(location, forecast, now),
        }
    }

    /// `now` is the local wall-clock time used to pick upcoming hours.
    pub fn format_weather(
        &self,
        location: &LocationRecord,
        payload: &ForecastPayload,
        now: NaiveDateTime,
    ) -> BarOutput {
        let scale = self.scale_for(location);
        let current = &payload.current;
        let condition = current.condition.text.trim();
        let icon = WeatherCondition::from_text(condition).icon();
        let temp = scale.pick(current.temp_c, current.temp_f);

        let text = format!("{} {}{}", icon, temp, scale.symbol());

        let place = if payload.location.name.is_empty() {
            location.location_name.clone()
        } else {
            format!("{}, {}", payload.location.name, payload.location.region)
        };

        let wind = match scale {
            Scale::Fahrenheit => format!("{} mph", current.wind_mph),
            Scale::Celsius => format!("{} km/h", current.wind_kph),
        };

        let mut lines = vec![
            format!(
                "<b>{} {}{} ({}{})</b>",
                escape_markup(condition),
                temp,
                scale.symbol(),
                scale.other().pick(current.temp_c, current.temp_f),
                scale.other().symbol()
            ),
            format!("Location: {}", escape_markup(&place)),
            format!(
                "Feels like: {}{} ({}{})",
                scale.pick(current.feelslike_c, current.feelslike_f),
                scale.symbol(),
                scale.other().pick(current.feelslike_c, current.feelslike_f),
                scale.other().symbol()
            ),
            format!("Wind: {} {}", wind, escape_markup(&current.wind_dir)),
            format!("Humidity: {}%", current.humidity.round()),
            format!("UV Index: {}", current.uv),
        ];

        let days = &payload.forecast.forecastday;

        let hourly = days
            .first()
            .map(|today| hourly_lines(today, scale, now))
            .unwrap_or_default();
        if !hourly.is_empty() {
            lines.push(String::new());
            lines.push(format!("<b>Hourly Forecast (Next {} Hours):</b>", MAX_HOURS));
            lines.extend(hourly);
        }

        if !days.is_empty() {
            lines.push(String::new());
            lines.push("<b>Daily Forecast:</b>".to_string());
            lines.extend(
                days.iter()
                    .take(MAX_DAYS)
                    .enumerate()
                    .map(|(i, day)| daily_line(i, day, scale)),
            );
        }

        lines.push(String::new());
        lines.push("<i>Data from WeatherAPI.com</i>".to_string());

        BarOutput {
            text,
            tooltip: lines.join("\n"),
        }
    }
}

/// Hours of `today` strictly after the current hour, capped at [`MAX_HOURS`].
fn hourly_lines(today: &ForecastDay, scale: Scale, now: NaiveDateTime) -> Vec<String> {
    today
        .hour
        .iter()
        .filter_map(|hour| {
            let time = NaiveDateTime::parse_from_str(&hour.time, "%Y-%m-%d %H:%M").ok()?;
            (time.hour() > now.hour()).then_some((time, hour))
        })
        .take(MAX_HOURS)
        .map(|(time, hour)| {
            format!(
                "{} {} {}{} {}{}",
                time.format("%H:%M"),
                icon_for(&hour.condition),
                scale.pick(hour.temp_c, hour.temp_f),
                scale.symbol(),
                escape_markup(hour.condition.text.trim()),
                rain_suffix(hour.chance_of_rain)
            )
        })
        .collect()
}

fn daily_line(index: usize, day: &ForecastDay, scale: Scale) -> String {
    let label = match index {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
            .map(|d| d.format("%A").to_string())
            .unwrap_or_else(|_| day.date.clone()),
    };

    let summary = &day.day;
    format!(
        "{}: {} {}°/{}{} {}{}",
        label,
        icon_for(&summary.condition),
        scale.pick(summary.maxtemp_c, summary.maxtemp_f),
        scale.pick(summary.mintemp_c, summary.mintemp_f),
        scale.symbol(),
        escape_markup(summary.condition.text.trim()),
        rain_suffix(summary.daily_chance_of_rain)
    )
}

fn icon_for(condition: &ConditionText) -> &'static str {
    WeatherCondition::from_text(&condition.text).icon()
}

fn rain_suffix(chance: u8) -> String {
    if chance > 0 {
        format!(" ({}% rain)", chance)
    } else {
        String::new()
    }
}

/// Escape text for Pango markup.
fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
