use chrono::{DateTime, Local, TimeZone};

/// Wall-clock time as shown next to log and push entries.
pub fn clock_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M:%S").to_string()
}

pub fn now_clock_time() -> String {
    clock_time(&Local::now())
}

/// The operator-facing response log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityLog {
    entries: Vec<String>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `[HH:MM:SS] message` and mirrors it to the `log` facade.
    pub fn record(&mut self, message: impl Into<String>) {
        self.record_at(&now_clock_time(), message);
    }

    pub fn record_at(&mut self, time: &str, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.entries.push(format!("[{time}] {message}"));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// All entries, one per line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn entries_are_timestamped_and_clearable() {
        let mut log = ActivityLog::new();
        log.record_at("09:15:02", "Frontend application initialized");
        log.record_at("09:15:03", "Generated new session ID: session_1_a");

        assert_eq!(
            log.text(),
            "[09:15:02] Frontend application initialized\n[09:15:03] Generated new session ID: session_1_a\n"
        );

        log.clear();
        assert!(log.entries().is_empty());
    }

    #[test]
    fn clock_time_is_hours_minutes_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(clock_time(&at), "07:08:09");
    }
}
