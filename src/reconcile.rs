//! Check-in reconciliation: optimistic local transitions followed by one
//! addressed remote write.
//!
//! Local state is always mutated before the remote write is issued, and
//! is deliberately NOT rolled back when that write fails; the operator
//! re-scans or refreshes to reconcile.

use crate::error::{DeskError, Result};
use crate::roster::{Attendee, RosterIndex};
use crate::store::RosterStore;
use chrono::Utc;
use surrealdb::sql::Datetime;
use tracing::{debug, warn};

/// Outcome of resolving and applying one scan
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Fresh check-in, applied locally and written through
    CheckedIn { attendee: Attendee },
    /// Informational, not an error; carries the prior check-in time
    AlreadyCheckedIn {
        attendee: Attendee,
        since: Option<Datetime>,
    },
    /// No index entry matched either resolution attempt
    NotFound { key: String },
}

/// Check an attendee in from raw scanner text.
///
/// Resolution tries the direct canonical form first, then the heuristic
/// pipeline. On success exactly one remote update is issued, scoped to
/// the owning document and addressed to the member slot when needed.
pub async fn check_in(
    index: &mut RosterIndex,
    store: &dyn RosterStore,
    raw: &str,
    event_prefix: &str,
) -> Result<ScanOutcome> {
    let key = match index.resolve(raw, event_prefix) {
        Ok(key) => key,
        Err(attempted) => {
            debug!("scan {:?} resolved to {:?}: not in index", raw, attempted);
            return Ok(ScanOutcome::NotFound { key: attempted });
        }
    };

    let entry = index.entry(&key).ok_or_else(|| DeskError::Internal {
        message: format!("resolved key {key} vanished from index"),
    })?;
    if entry.attendee.checked_in {
        return Ok(ScanOutcome::AlreadyCheckedIn {
            attendee: entry.attendee.clone(),
            since: entry.attendee.check_in_time.clone(),
        });
    }

    let now = Datetime::from(Utc::now());
    let write = index
        .apply_transition(&key, true, Some(now))
        .ok_or_else(|| DeskError::Internal {
            message: format!("check-in transition failed for {key}"),
        })?;
    let attendee = index
        .entry(&key)
        .map(|e| e.attendee.clone())
        .ok_or_else(|| DeskError::Internal {
            message: format!("entry {key} missing after transition"),
        })?;

    if let Err(e) = store.update_attendee(&write.target, &write.patch).await {
        warn!("remote update failed for {}: {}", write.target.doc_id, e);
        return Err(DeskError::Sync {
            message: remote_message(e),
        });
    }
    Ok(ScanOutcome::CheckedIn { attendee })
}

/// Flip one attendee between checked-in and pending from the list view.
///
/// Unchecking clears the check-in time. Same optimistic-then-write
/// policy as [`check_in`]; the caller surfaces failures.
pub async fn toggle(
    index: &mut RosterIndex,
    store: &dyn RosterStore,
    key: &str,
) -> Result<Attendee> {
    let entry = index.entry(key).ok_or_else(|| DeskError::Internal {
        message: format!("ticket {key} not in index"),
    })?;
    let next_checked = !entry.attendee.checked_in;
    let when = if next_checked {
        Some(Datetime::from(Utc::now()))
    } else {
        None
    };

    let write = index
        .apply_transition(key, next_checked, when)
        .ok_or_else(|| DeskError::Internal {
            message: format!("toggle transition failed for {key}"),
        })?;
    let attendee = index
        .entry(key)
        .map(|e| e.attendee.clone())
        .ok_or_else(|| DeskError::Internal {
            message: format!("entry {key} missing after transition"),
        })?;

    if let Err(e) = store.update_attendee(&write.target, &write.patch).await {
        warn!("remote update failed for {}: {}", write.target.doc_id, e);
        return Err(DeskError::Sync {
            message: remote_message(e),
        });
    }
    Ok(attendee)
}

/// Unwrap the store's own message so Sync errors don't nest labels
fn remote_message(err: DeskError) -> String {
    match err {
        DeskError::Database { message } => message,
        other => other.to_string(),
    }
}
