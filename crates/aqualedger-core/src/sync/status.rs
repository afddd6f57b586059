//! Single-glance sync badge derived from connectivity and record counts.

use std::fmt;

use serde::Serialize;

use crate::db::StatusCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum SyncBadge {
    /// Some uploads failed
    Error(usize),
    Syncing,
    /// Local changes waiting for upload
    Pending(usize),
    Synced,
    Offline,
}

impl fmt::Display for SyncBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(count) => write!(f, "Sync Failed ({count})"),
            Self::Syncing => f.write_str("Syncing..."),
            Self::Pending(count) => write!(f, "Pending ({count})"),
            Self::Synced => f.write_str("Synced"),
            Self::Offline => f.write_str("Offline"),
        }
    }
}

/// Offline shows pending work if any; online priority is
/// error, then syncing, then pending, then synced.
///
/// `counts.conflict` is not consulted: conflicted records wait on the user,
/// not on the sync loop, and are listed by the conflict view instead.
pub const fn overall_status(is_online: bool, is_syncing: bool, counts: &StatusCounts) -> SyncBadge {
    if !is_online {
        return if counts.pending > 0 {
            SyncBadge::Pending(counts.pending)
        } else {
            SyncBadge::Offline
        };
    }

    if counts.error > 0 {
        SyncBadge::Error(counts.error)
    } else if is_syncing {
        SyncBadge::Syncing
    } else if counts.pending > 0 {
        SyncBadge::Pending(counts.pending)
    } else {
        SyncBadge::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn counts(pending: usize, error: usize) -> StatusCounts {
        StatusCounts {
            pending,
            synced: 4,
            error,
            conflict: 0,
        }
    }

    #[test]
    fn offline_shows_pending_or_offline() {
        assert_eq!(overall_status(false, false, &counts(2, 1)), SyncBadge::Pending(2));
        assert_eq!(overall_status(false, true, &counts(0, 3)), SyncBadge::Offline);
    }

    #[test]
    fn online_priority_order() {
        assert_eq!(overall_status(true, true, &counts(2, 1)), SyncBadge::Error(1));
        assert_eq!(overall_status(true, true, &counts(2, 0)), SyncBadge::Syncing);
        assert_eq!(overall_status(true, false, &counts(2, 0)), SyncBadge::Pending(2));
        assert_eq!(overall_status(true, false, &counts(0, 0)), SyncBadge::Synced);
    }

    #[test]
    fn conflicts_do_not_change_the_badge() {
        let conflicted = StatusCounts {
            conflict: 2,
            ..counts(0, 0)
        };
        assert_eq!(overall_status(true, false, &conflicted), SyncBadge::Synced);
        assert_eq!(overall_status(false, false, &conflicted), SyncBadge::Offline);
    }

    #[test]
    fn badge_labels() {
        assert_eq!(SyncBadge::Error(3).to_string(), "Sync Failed (3)");
        assert_eq!(SyncBadge::Pending(1).to_string(), "Pending (1)");
    }
}
