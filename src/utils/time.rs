use chrono::{DateTime, Utc};

pub fn format_utc_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
