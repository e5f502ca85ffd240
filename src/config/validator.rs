use std::collections::HashSet;

use crate::error::{AppError, Result};

use super::Config;

/// Validate the assembled configuration once at startup; any issue is fatal.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    if config.instruments.is_empty() {
        issues.push("symbols must list at least one instrument".to_string());
    }

    let mut seen = HashSet::new();
    for instrument in &config.instruments {
        if !seen.insert(instrument.key()) {
            issues.push(format!("duplicate instrument `{}`", instrument.key()));
        }
    }

    if config.poll_interval.as_secs() == 0 {
        issues.push("poll_interval_secs must be greater than zero".to_string());
    }

    if config.windows.is_empty() {
        issues.push("windows must define at least one look-back window".to_string());
    }

    for (minutes, threshold) in &config.windows {
        if *minutes == 0 {
            issues.push("a look-back window of 0 minutes is not measurable".to_string());
        }
        if *threshold <= 0.0 {
            issues.push(format!(
                "threshold for the {minutes} minute window must be positive"
            ));
        } else if *threshold > config.sanity_ceiling_percent {
            issues.push(format!(
                "threshold for the {minutes} minute window exceeds the sanity ceiling"
            ));
        }
    }

    if config.retention_hours == 0 {
        issues.push("retention_hours must be greater than zero".to_string());
    } else if let Some(widest) = config.windows.keys().max() {
        if *widest > config.retention_hours * 60 {
            issues.push(format!(
                "retention_hours must cover the widest look-back window ({widest} minutes)"
            ));
        }
    }

    if config.sanity_ceiling_percent <= 0.0 {
        issues.push("sanity_ceiling_percent must be positive".to_string());
    }

    validate_url("spot_api_url", &config.endpoints.spot_api_url, &mut issues);
    validate_url(
        "futures_api_url",
        &config.endpoints.futures_api_url,
        &mut issues,
    );

    if let Some(proxy) = &config.proxy_url {
        if proxy.trim().is_empty() {
            issues.push("proxy_url must not be empty when set".to_string());
        }
    }

    if config.telegram.enabled {
        if config.telegram.bot_token.trim().is_empty() {
            issues.push("telegram.bot_token is required when telegram is enabled".to_string());
        }
        if config.telegram.chat_id.trim().is_empty() {
            issues.push("telegram.chat_id is required when telegram is enabled".to_string());
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "invalid configuration: {}",
            issues.join("; ")
        )))
    }
}

fn validate_url(field: &str, value: &str, issues: &mut Vec<String>) {
    if value.trim().is_empty() {
        issues.push(format!("{field} must not be empty"));
    } else if !value.starts_with("http://") && !value.starts_with("https://") {
        issues.push(format!("{field} must be an http(s) URL"));
    }
}
