use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{CourseId, CourseItemId, UserId};
use crate::progress::ProgressSnapshot;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("read percent must be a finite number, got {0}")]
    NonFiniteReadPercent(f64),

    #[error("read percent out of range: {0}")]
    ReadPercentOutOfRange(u8),
}

//
// ─── READ PERCENT ─────────────────────────────────────────────────────────────
//

/// Whole-number share of a chapter a user has read, always within 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReadPercent(u8);

impl ReadPercent {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Build from a stored value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ReadPercentOutOfRange` above 100.
    pub fn new(value: u8) -> Result<Self, ProgressError> {
        if value > 100 {
            return Err(ProgressError::ReadPercentOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Build from a client-reported value: clamped to 0..=100, then rounded half up.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NonFiniteReadPercent` for NaN or infinities.
    pub fn from_reported(reported: f64) -> Result<Self, ProgressError> {
        if !reported.is_finite() {
            return Err(ProgressError::NonFiniteReadPercent(reported));
        }
        let clamped = reported.clamp(0.0, 100.0);
        // floor(x + 0.5) is round-half-up for non-negative x
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = (clamped + 0.5).floor().min(100.0) as u8;
        Ok(Self(rounded))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Monotonic merge: read progress never regresses.
    #[must_use]
    pub fn merge(self, incoming: Self) -> Self {
        self.max(incoming)
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

//
// ─── COMPLETION MARKER ────────────────────────────────────────────────────────
//

/// Existence of this record means the item is done for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionMarker {
    pub user_id: UserId,
    pub course_item_id: CourseItemId,
    pub completed_at: DateTime<Utc>,
}

//
// ─── COURSE PROGRESS ──────────────────────────────────────────────────────────
//

/// Cached course-level aggregate. Derivable at any time from markers and read progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress_percent: u8,
    pub finished: bool,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CourseProgress {
    /// Build the row that replaces `previous` after a recompute.
    ///
    /// `finished_at` is kept while the course stays finished, stamped with
    /// `now` when it becomes finished, and cleared otherwise.
    #[must_use]
    pub fn recomputed(
        user_id: UserId,
        course_id: CourseId,
        snapshot: &ProgressSnapshot,
        previous: Option<&CourseProgress>,
        now: DateTime<Utc>,
    ) -> Self {
        let finished_at = if snapshot.finished {
            previous
                .filter(|p| p.finished)
                .and_then(|p| p.finished_at)
                .or(Some(now))
        } else {
            None
        };

        Self {
            user_id,
            course_id,
            progress_percent: snapshot.progress_percent,
            finished: snapshot.finished,
            finished_at,
            updated_at: now,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
