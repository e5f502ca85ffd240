pub mod time;

pub use time::format_utc_timestamp;
