//! Fetch-Outcome Log
//!
//! Translates a source resolution into the per-source status, latest message
//! and bounded rolling log that get written back to the scheme store.

use std::time::{Duration, SystemTime};

use crate::model::{FetchStatus, OutcomeEntry, OutcomeLevel, SourceConfig};
use crate::resolver::Resolution;

/// Entries older than this are dropped from the rolling log.
pub const UPDATE_LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Hard cap on retained log entries.
pub const UPDATE_LOG_MAX_ENTRIES: usize = 100;

/// Human-readable message for one resolution.
pub fn outcome_message(resolution: &Resolution) -> String {
    if resolution.is_success() {
        if resolution.from_cache {
            return format!(
                "Subscription refresh failed, served cached snapshot: {}",
                resolution.error.as_deref().unwrap_or("unknown error")
            );
        }
        return "Subscription refreshed".to_string();
    }
    format!(
        "Subscription refresh failed: {}",
        resolution.error.as_deref().unwrap_or("unknown error")
    )
}

/// Severity tag for one resolution.
pub fn outcome_level(resolution: &Resolution) -> OutcomeLevel {
    if resolution.is_success() && !resolution.from_cache {
        OutcomeLevel::Success
    } else if resolution.from_cache {
        OutcomeLevel::Cache
    } else {
        OutcomeLevel::Error
    }
}

/// Prepend a new entry, dropping entries past the retention window and then
/// truncating to the entry cap. Newest first.
pub fn append_entries(
    existing: &[OutcomeEntry],
    now: SystemTime,
    message: String,
    level: OutcomeLevel,
) -> Vec<OutcomeEntry> {
    let cutoff = now.checked_sub(UPDATE_LOG_RETENTION);
    let mut entries = vec![OutcomeEntry {
        time: now,
        level,
        message,
    }];
    entries.extend(
        existing
            .iter()
            .filter(|entry| match cutoff {
                Some(cutoff) => entry.time >= cutoff,
                None => true,
            })
            .cloned(),
    );
    entries.truncate(UPDATE_LOG_MAX_ENTRIES);
    entries
}

/// Record a resolution on its source config. Only a live success counts as
/// `success`; a cache fallback keeps the error visible to operators.
pub fn apply_outcome(source: &mut SourceConfig, resolution: &Resolution, now: SystemTime) {
    let message = outcome_message(resolution);
    let level = outcome_level(resolution);

    source.status = if resolution.is_success() && !resolution.from_cache {
        FetchStatus::Success
    } else {
        FetchStatus::Error
    };
    source.last_fetch = Some(now);
    source.update_logs = append_entries(&source.update_logs, now, message.clone(), level);
    source.update_log = Some(message);

    if resolution.is_success() && !resolution.from_cache {
        source.error = None;
    } else {
        source.error = Some(
            resolution
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        );
    }
}
