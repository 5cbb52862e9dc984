use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use academy_core::model::{CourseItemId, UserId};

type AttemptKey = (UserId, CourseItemId);

/// One async mutex per `(user, assessment)` pair.
///
/// Holding the guard serializes the count-then-insert sequence of attempt
/// submission; disjoint pairs never contend.
#[derive(Default)]
pub struct AttemptLocks {
    inflight: Mutex<HashMap<AttemptKey, Arc<Mutex<()>>>>,
}

impl AttemptLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: UserId, assessment_id: CourseItemId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // entries nobody holds or waits on can go
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry((user_id, assessment_id))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inflight.lock().await.len()
    }
}
