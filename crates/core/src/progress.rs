//! Course-level progress aggregation.
//!
//! Progress is always recomputed from scratch out of completion markers and
//! chapter read percentages; nothing here patches a previous value.

use std::collections::{HashMap, HashSet};

use crate::model::{CourseItemId, CourseItemKind, ReadPercent, RequiredItem};

/// Result of one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub required_total: u32,
    /// Required items that carry a completion marker.
    pub completed: u32,
    pub progress_percent: u8,
    pub finished: bool,
}

impl ProgressSnapshot {
    /// State of a course with no required items: 0 % and never finished.
    pub const EMPTY: Self = Self {
        required_total: 0,
        completed: 0,
        progress_percent: 0,
        finished: false,
    };
}

/// Combine completion markers and partial chapter reads into a course percentage.
///
/// Every required item with a marker counts as one whole unit. A required
/// chapter without a marker counts `read_percent / 100` of a unit; quizzes and
/// exams without a marker count nothing. The percent is floored, and
/// `finished` only depends on markers, so partial reads alone never finish a
/// course.
///
/// Markers and read entries for items outside `required` are ignored.
#[must_use]
pub fn aggregate(
    required: &[RequiredItem],
    completed: &HashSet<CourseItemId>,
    read: &HashMap<CourseItemId, ReadPercent>,
) -> ProgressSnapshot {
    let mut seen = HashSet::with_capacity(required.len());
    let mut required_total: u64 = 0;
    let mut completed_count: u64 = 0;
    // credit in hundredths of an item so flooring stays exact
    let mut credit_hundredths: u64 = 0;

    for item in required {
        if !seen.insert(item.id) {
            continue;
        }
        required_total += 1;

        if completed.contains(&item.id) {
            completed_count += 1;
            credit_hundredths += 100;
        } else if item.kind == CourseItemKind::Chapter {
            let percent = read.get(&item.id).copied().unwrap_or_default();
            credit_hundredths += u64::from(percent.value());
        }
    }

    if required_total == 0 {
        return ProgressSnapshot::EMPTY;
    }

    let percent = (credit_hundredths / required_total).min(100);

    ProgressSnapshot {
        required_total: u32::try_from(required_total).unwrap_or(u32::MAX),
        completed: u32::try_from(completed_count).unwrap_or(u32::MAX),
        progress_percent: u8::try_from(percent).unwrap_or(100),
        finished: completed_count >= required_total,
    }
}
