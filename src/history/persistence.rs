use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{AppError, Result};

use super::{PriceHistory, Sample};

/// Write the full series mapping as pretty-printed JSON.
pub fn save_history(history: &PriceHistory, path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(history.series())
        .map_err(|e| AppError::Persistence(format!("failed to encode state: {e}")))?;

    fs::write(path, payload)
        .map_err(|e| AppError::Persistence(format!("failed to write {}: {e}", path.display())))?;

    debug!("price history saved to {}", path.display());
    Ok(())
}

/// Load a previously saved mapping; a missing or corrupt file yields an empty store.
pub fn load_history(path: &Path, retention_hours: u32) -> PriceHistory {
    if !path.exists() {
        return PriceHistory::new(retention_hours);
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("failed to read state file {}: {e}", path.display());
            return PriceHistory::new(retention_hours);
        }
    };

    match serde_json::from_str::<HashMap<String, Vec<Sample>>>(&contents) {
        Ok(series) => PriceHistory::from_series(series, retention_hours),
        Err(e) => {
            warn!("ignoring corrupt state file {}: {e}", path.display());
            PriceHistory::new(retention_hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::env;
    use std::path::PathBuf;

    fn temp_state_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("pricewatch-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn round_trips_the_series_mapping() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let mut history = PriceHistory::new(24);
        history.append("BTCUSDT", 43500.5, base).unwrap();
        history
            .append("BTCUSDT", 43620.0, base + Duration::minutes(1))
            .unwrap();
        history
            .append("ETHUSDT_PERP", 2301.25, base + Duration::minutes(1))
            .unwrap();

        let path = temp_state_path("round-trip");
        save_history(&history, &path).unwrap();
        let reloaded = load_history(&path, 24);
        let _ = fs::remove_file(&path);

        assert_eq!(reloaded.series(), history.series());
    }

    #[test]
    fn corrupt_state_file_yields_an_empty_store() {
        let path = temp_state_path("corrupt");
        fs::write(&path, "not json at all").unwrap();

        let history = load_history(&path, 24);
        let _ = fs::remove_file(&path);

        assert!(history.series().is_empty());
    }

    #[test]
    fn missing_state_file_yields_an_empty_store() {
        let path = temp_state_path("missing");
        let _ = fs::remove_file(&path);

        let history = load_history(&path, 24);
        assert!(history.series().is_empty());
    }
}
