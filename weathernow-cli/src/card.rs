//! Text rendering of a weather record, shared by `show` and the TUI.

use weathernow_core::WeatherRecord;

const MISSING: &str = "--";

pub fn temp(value: Option<i64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |t| format!("{t}°C"))
}

/// "Clouds • overcast clouds"
pub fn conditions(record: &WeatherRecord) -> String {
    match (&record.weather_main, &record.weather_desc) {
        (Some(main), Some(desc)) => format!("{main} • {desc}"),
        (Some(one), None) | (None, Some(one)) => one.clone(),
        (None, None) => MISSING.to_string(),
    }
}

pub fn place(record: &WeatherRecord) -> String {
    let city = if record.city.is_empty() {
        MISSING
    } else {
        record.city.as_str()
    };
    match &record.country {
        Some(country) => format!("{city}, {country}"),
        None => city.to_string(),
    }
}

pub fn updated(record: &WeatherRecord) -> String {
    record
        .observed_at()
        .map_or_else(|| MISSING.to_string(), |t| t.format("%H:%M:%S").to_string())
}

/// Labelled detail rows below the headline.
pub fn rows(record: &WeatherRecord, icon_base: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Feels like", temp(record.feels_like)),
        ("City", place(record)),
        (
            "Min / Max",
            format!("{} • {}", temp(record.temp_min), temp(record.temp_max)),
        ),
        (
            "Humidity",
            record
                .humidity
                .map_or_else(|| MISSING.to_string(), |h| format!("{h}%")),
        ),
        (
            "Wind",
            record
                .wind_speed
                .map_or_else(|| MISSING.to_string(), |w| format!("{w} m/s")),
        ),
        (
            "Icon",
            record
                .icon_url(icon_base)
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        ("Updated", updated(record)),
    ]
}

pub fn render_plain(record: &WeatherRecord, icon_base: &str) -> String {
    let mut out = format!("{}  {}\n", temp(record.temp), conditions(record));
    for (label, value) in rows(record, icon_base) {
        out.push_str(&format!("{:<11} {value}\n", format!("{label}:")));
    }
    out
}
