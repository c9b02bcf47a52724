use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::models::StudentProgress;

/// Mutation applied to one student's aggregate while it is held exclusively.
pub type ProgressMutation<'a> = Box<dyn FnOnce(&mut StudentProgress) + Send + 'a>;

/// Key-value home for student aggregates, keyed by student id.
///
/// Implementations must serialize `update` and `delete` per student id; reads
/// return owned snapshots.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Returns the aggregate, inserting a zeroed one if absent. The write
    /// path goes through `update`, which creates the aggregate the same way
    /// under the student's lock.
    async fn get_or_create(&self, student_id: &str) -> Result<StudentProgress>;

    async fn get(&self, student_id: &str) -> Result<Option<StudentProgress>>;

    /// Every aggregate currently held, in no particular order.
    async fn get_all(&self) -> Result<Vec<StudentProgress>>;

    /// Removes the aggregate. Returns whether one existed.
    async fn delete(&self, student_id: &str) -> Result<bool>;

    /// Runs `mutation` on the (lazily created) aggregate and returns the
    /// resulting snapshot.
    async fn update<'a>(
        &self,
        student_id: &str,
        mutation: ProgressMutation<'a>,
    ) -> Result<StudentProgress>;

    async fn student_count(&self) -> Result<usize>;
}

type Entry = Arc<Mutex<StudentProgress>>;

/// Process-lifetime store. The outer lock only guards the id -> entry map;
/// each student's aggregate has its own mutex.
#[derive(Default)]
pub struct InMemoryProgressStore {
    students: RwLock<HashMap<String, Entry>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, student_id: &str) -> Option<Entry> {
        self.students.read().await.get(student_id).cloned()
    }

    async fn entry_or_insert(&self, student_id: &str) -> Entry {
        if let Some(entry) = self.entry(student_id).await {
            return entry;
        }

        let mut students = self.students.write().await;
        students
            .entry(student_id.to_string())
            .or_insert_with(|| {
                tracing::info!("Creating progress record for student {}", student_id);
                Arc::new(Mutex::new(StudentProgress::new(student_id)))
            })
            .clone()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get_or_create(&self, student_id: &str) -> Result<StudentProgress> {
        let entry = self.entry_or_insert(student_id).await;
        let progress = entry.lock().await;
        Ok(progress.clone())
    }

    async fn get(&self, student_id: &str) -> Result<Option<StudentProgress>> {
        let Some(entry) = self.entry(student_id).await else {
            return Ok(None);
        };
        let progress = entry.lock().await;
        Ok(Some(progress.clone()))
    }

    async fn get_all(&self) -> Result<Vec<StudentProgress>> {
        let entries: Vec<Entry> = self.students.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.lock().await.clone());
        }
        Ok(snapshots)
    }

    async fn delete(&self, student_id: &str) -> Result<bool> {
        let removed = self.students.write().await.remove(student_id);
        match removed {
            Some(entry) => {
                // Wait out an update that grabbed the entry before removal.
                drop(entry.lock().await);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update<'a>(
        &self,
        student_id: &str,
        mutation: ProgressMutation<'a>,
    ) -> Result<StudentProgress> {
        let entry = self.entry_or_insert(student_id).await;
        let mut progress = entry.lock().await;
        mutation(&mut *progress);
        Ok(progress.clone())
    }

    async fn student_count(&self) -> Result<usize> {
        Ok(self.students.read().await.len())
    }
}
