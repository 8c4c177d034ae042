use chrono::{DateTime, FixedOffset, Offset, Utc};
use weatherly_core::{CollectionChange, Current, Daily, Hourly, Location, Units};

/// Formats store data for the terminal, in the location's local time.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    units: Units,
    offset: FixedOffset,
}

impl Renderer {
    pub fn new(units: Units, timezone_offset: i32) -> Self {
        let offset = FixedOffset::east_opt(timezone_offset).unwrap_or_else(|| Utc.fix());
        Self { units, offset }
    }

    fn local(&self, time: Option<DateTime<Utc>>, fmt: &str) -> String {
        time.map(|t| t.with_timezone(&self.offset).format(fmt).to_string())
            .unwrap_or_else(|| "--".to_string())
    }

    fn temp(&self, value: f64) -> String {
        format!("{:.0}{}", value, self.units.temperature_suffix())
    }

    pub fn location(&self, location: &Location) -> String {
        match location.coordinates() {
            Some((lat, lon)) => format!("{} ({lat:.2}, {lon:.2})", location.display_name()),
            None => format!("{} (no coordinates)", location.display_name()),
        }
    }

    pub fn current(&self, current: &Current) -> String {
        let condition = current
            .condition()
            .map(|c| c.description.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        format!(
            "{}  {}, feels like {}\n{}  humidity {}%  wind {:.1} {}",
            self.local(current.time(), "%H:%M"),
            self.temp(current.temp),
            self.temp(current.feels_like),
            condition,
            current.humidity,
            current.wind_speed,
            self.units.speed_suffix(),
        )
    }

    pub fn hour(&self, hour: &Hourly) -> String {
        format!(
            "{}  {:>5}  {:>3.0}%  {}",
            self.local(hour.time(), "%H:%M"),
            self.temp(hour.temp),
            hour.pop * 100.0,
            hour.condition().map(|c| c.main.as_str()).unwrap_or("-"),
        )
    }

    pub fn day(&self, day: &Daily) -> String {
        format!(
            "{}  {:>5} / {:>5}  {:>3.0}%  {}",
            self.local(day.time(), "%a %d %b"),
            self.temp(day.temp.min),
            self.temp(day.temp.max),
            day.pop * 100.0,
            day.condition().map(|c| c.main.as_str()).unwrap_or("-"),
        )
    }
}

pub fn describe_change(change: &CollectionChange) -> String {
    match change {
        CollectionChange::Update { insertions, .. } if !insertions.is_empty() => {
            "Location selected".to_string()
        }
        CollectionChange::Update { modifications, .. } if !modifications.is_empty() => {
            "Location changed".to_string()
        }
        CollectionChange::Update { deletions, .. } if !deletions.is_empty() => {
            "Location removed".to_string()
        }
        CollectionChange::Update { .. } => "No change".to_string(),
        CollectionChange::Error(message) => format!("Location observation failed: {message}"),
    }
}
