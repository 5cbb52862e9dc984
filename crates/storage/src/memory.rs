use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use academy_core::model::{
    Assessment, AssessmentAttempt, AttemptHistory, AttemptId, AttemptSummary, CompletionMarker,
    Course, CourseId, CourseItem, CourseItemId, CourseProgress, Enrollment, NewAttempt,
    ReadPercent, RequiredItem, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repository::{
    AssessmentRepository, AttemptRepository, CourseRepository, EnrollmentRepository,
    ProgressRepository, StorageError,
};

type UserItemKey = (UserId, CourseItemId);
type UserCourseKey = (UserId, CourseId);

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    items: Arc<Mutex<HashMap<CourseItemId, CourseItem>>>,
    assessments: Arc<Mutex<HashMap<CourseItemId, Assessment>>>,
    enrollments: Arc<Mutex<HashMap<UserCourseKey, Enrollment>>>,
    attempts: Arc<Mutex<Vec<AssessmentAttempt>>>,
    markers: Arc<Mutex<HashMap<UserItemKey, CompletionMarker>>>,
    reads: Arc<Mutex<HashMap<UserItemKey, ReadPercent>>>,
    course_progress: Arc<Mutex<HashMap<UserCourseKey, CourseProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        lock(&self.courses)?.insert(course.id, course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(lock(&self.courses)?.get(&id).cloned())
    }

    async fn upsert_course_item(&self, item: &CourseItem) -> Result<(), StorageError> {
        if !lock(&self.courses)?.contains_key(&item.course_id) {
            return Err(StorageError::NotFound);
        }
        lock(&self.items)?.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_course_item(&self, id: CourseItemId) -> Result<Option<CourseItem>, StorageError> {
        Ok(lock(&self.items)?.get(&id).cloned())
    }

    async fn list_course_items(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CourseItem>, StorageError> {
        let guard = lock(&self.items)?;
        let mut items: Vec<CourseItem> = guard
            .values()
            .filter(|item| item.course_id == course_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.position, item.id));
        Ok(items)
    }

    async fn list_required_items(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<RequiredItem>, StorageError> {
        let items = self.list_course_items(course_id).await?;
        Ok(items
            .iter()
            .filter(|item| item.is_required)
            .map(RequiredItem::from)
            .collect())
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        if !lock(&self.items)?.contains_key(&assessment.course_item_id) {
            return Err(StorageError::NotFound);
        }
        let mut stored = assessment.clone();
        stored.sort_by_position();
        lock(&self.assessments)?.insert(assessment.course_item_id, stored);
        Ok(())
    }

    async fn get_assessment(
        &self,
        course_item_id: CourseItemId,
    ) -> Result<Option<Assessment>, StorageError> {
        Ok(lock(&self.assessments)?.get(&course_item_id).cloned())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn enroll(&self, enrollment: &Enrollment) -> Result<Enrollment, StorageError> {
        let mut guard = lock(&self.enrollments)?;
        let stored = guard
            .entry((enrollment.user_id, enrollment.course_id))
            .or_insert_with(|| enrollment.clone());
        Ok(stored.clone())
    }

    async fn is_enrolled(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, StorageError> {
        Ok(lock(&self.enrollments)?.contains_key(&(user_id, course_id)))
    }

    async fn list_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = lock(&self.enrollments)?;
        let mut out: Vec<Enrollment> = guard
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.activated_at
                .cmp(&a.activated_at)
                .then(b.course_id.cmp(&a.course_id))
        });
        Ok(out)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn attempt_history(
        &self,
        user_id: UserId,
        assessment_id: CourseItemId,
    ) -> Result<AttemptHistory, StorageError> {
        let guard = lock(&self.attempts)?;
        let mut history = AttemptHistory::default();
        for attempt in guard
            .iter()
            .filter(|a| a.user_id == user_id && a.assessment_id == assessment_id)
        {
            history.attempts += 1;
            history.passed_any |= attempt.passed;
        }
        Ok(history)
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = lock(&self.attempts)?;
        let id = AttemptId::new(guard.len() as u64 + 1);
        guard.push(attempt.clone().assign_id(id));
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<AssessmentAttempt>, StorageError> {
        Ok(lock(&self.attempts)?.iter().find(|a| a.id == id).cloned())
    }

    async fn latest_attempts(
        &self,
        user_id: UserId,
        assessment_ids: &[CourseItemId],
    ) -> Result<Vec<AttemptSummary>, StorageError> {
        let guard = lock(&self.attempts)?;
        let mut latest: HashMap<CourseItemId, &AssessmentAttempt> = HashMap::new();
        for attempt in guard
            .iter()
            .filter(|a| a.user_id == user_id && assessment_ids.contains(&a.assessment_id))
        {
            let newer = latest.get(&attempt.assessment_id).is_none_or(|current| {
                (attempt.started_at, attempt.id) > (current.started_at, current.id)
            });
            if newer {
                latest.insert(attempt.assessment_id, attempt);
            }
        }
        let mut out: Vec<AttemptSummary> = latest.values().map(|a| a.summary()).collect();
        out.sort_by_key(|s| s.assessment_id);
        Ok(out)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn mark_completed(&self, marker: &CompletionMarker) -> Result<bool, StorageError> {
        let mut guard = lock(&self.markers)?;
        let key = (marker.user_id, marker.course_item_id);
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, marker.clone());
        Ok(true)
    }

    async fn completed_items(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashSet<CourseItemId>, StorageError> {
        let guard = lock(&self.markers)?;
        Ok(item_ids
            .iter()
            .copied()
            .filter(|id| guard.contains_key(&(user_id, *id)))
            .collect())
    }

    async fn merge_read_percent(
        &self,
        user_id: UserId,
        course_item_id: CourseItemId,
        percent: ReadPercent,
        _at: DateTime<Utc>,
    ) -> Result<ReadPercent, StorageError> {
        let mut guard = lock(&self.reads)?;
        let stored = guard.entry((user_id, course_item_id)).or_default();
        *stored = stored.merge(percent);
        Ok(*stored)
    }

    async fn read_percents(
        &self,
        user_id: UserId,
        item_ids: &[CourseItemId],
    ) -> Result<HashMap<CourseItemId, ReadPercent>, StorageError> {
        let guard = lock(&self.reads)?;
        Ok(item_ids
            .iter()
            .filter_map(|id| guard.get(&(user_id, *id)).map(|pct| (*id, *pct)))
            .collect())
    }

    async fn upsert_course_progress(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        lock(&self.course_progress)?.insert((progress.user_id, progress.course_id), progress.clone());
        Ok(())
    }

    async fn get_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        Ok(lock(&self.course_progress)?.get(&(user_id, course_id)).cloned())
    }

    async fn latest_course_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let guard = lock(&self.course_progress)?;
        Ok(guard
            .values()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| (p.updated_at, p.course_id))
            .cloned())
    }
}
