//! Optimistic task mutation with reconciliation by issue order.
//!
//! A session-local task collection applies edits immediately and issues the
//! durable write in the background. Each task id carries a monotonically
//! increasing sequence number; a durable response (success or failure) is
//! honored only if its sequence is still the latest issued for that id.
//! Stale responses arriving late are discarded, which doubles as soft
//! cancellation: there is no explicit abort of in-flight writes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use db::models::task::{Task, UpdateTask, ValidationError};
use thiserror::Error;
use uuid::Uuid;

/// Failure surfaced by the durable update boundary.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("update failed ({status}): {message}")]
pub struct WriteError {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown task")]
    UnknownTask,
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Durable side of an optimistic update.
#[async_trait]
pub trait TaskWriter: Send + Sync {
    async fn update(&self, id: Uuid, patch: UpdateTask) -> Result<Task, WriteError>;
}

/// What became of an update once its durable call resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// This was the latest write for the task; the server payload is now
    /// authoritative local state.
    Committed(Task),
    /// A newer write to the same task was issued while this one was in
    /// flight; its result was discarded without touching local state.
    Superseded,
}

#[derive(Default)]
struct StoreState {
    tasks: HashMap<Uuid, Task>,
    latest_seq: HashMap<Uuid, u64>,
}

pub struct OptimisticTaskStore<W> {
    state: Mutex<StoreState>,
    writer: W,
}

impl<W: TaskWriter> OptimisticTaskStore<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            writer,
        }
    }

    /// Seed the collection from an authoritative load.
    pub fn load(&self, tasks: Vec<Task>) {
        let mut state = self.lock();
        for task in tasks {
            state.tasks.insert(task.id, task);
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.lock().tasks.get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.values().cloned().collect()
    }

    // The lock guards short synchronous sections only; it is never held
    // across an await.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `patch` locally, issue the durable write, and honor its result
    /// only if no newer write to the same task was issued meanwhile. On a
    /// still-latest failure the task reverts to its pre-mutation snapshot and
    /// the error is re-raised.
    pub async fn update(&self, id: Uuid, patch: UpdateTask) -> Result<UpdateOutcome, StoreError> {
        patch.validate()?;

        let (seq, snapshot) = {
            let mut state = self.lock();
            let task = state.tasks.get_mut(&id).ok_or(StoreError::UnknownTask)?;
            let snapshot = task.clone();
            patch.apply_to(task);
            if task.completed {
                task.started = false;
            }
            let seq = state.latest_seq.entry(id).and_modify(|s| *s += 1).or_insert(1);
            (*seq, snapshot)
        };

        match self.writer.update(id, patch).await {
            Ok(server_task) => {
                let mut state = self.lock();
                if state.latest_seq.get(&id) == Some(&seq) {
                    state.tasks.insert(id, server_task.clone());
                    Ok(UpdateOutcome::Committed(server_task))
                } else {
                    Ok(UpdateOutcome::Superseded)
                }
            }
            Err(err) => {
                let mut state = self.lock();
                if state.latest_seq.get(&id) == Some(&seq) {
                    state.tasks.insert(id, snapshot);
                    Err(StoreError::Write(err))
                } else {
                    // A newer legitimate mutation is in flight; reverting now
                    // would clobber it.
                    Ok(UpdateOutcome::Superseded)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use chrono::Utc;
    use db::models::task::Recurrence;
    use tokio::sync::oneshot;

    use super::*;

    fn task(id: Uuid, title: &str) -> Task {
        Task {
            id,
            owner_id: "user-1".to_string(),
            project_id: None,
            title: title.to_string(),
            notes: None,
            due_date: None,
            recurrence: Recurrence::None,
            started: false,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn title_patch(title: &str) -> UpdateTask {
        UpdateTask {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    /// Writer whose responses are released by the test, in whatever order the
    /// test chooses. Each call consumes the next gate in issue order.
    struct GatedWriter {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<Task, WriteError>>>>,
    }

    impl GatedWriter {
        fn new(count: usize) -> (Self, Vec<oneshot::Sender<Result<Task, WriteError>>>) {
            let mut senders = Vec::new();
            let mut gates = VecDeque::new();
            for _ in 0..count {
                let (tx, rx) = oneshot::channel();
                senders.push(tx);
                gates.push_back(rx);
            }
            (
                Self {
                    gates: Mutex::new(gates),
                },
                senders,
            )
        }
    }

    #[async_trait]
    impl TaskWriter for GatedWriter {
        async fn update(&self, _id: Uuid, _patch: UpdateTask) -> Result<Task, WriteError> {
            let gate = self.gates.lock().unwrap().pop_front().expect("gate");
            gate.await.expect("gate sender dropped")
        }
    }

    /// Writer that answers immediately with the patched task.
    struct EchoWriter;

    #[async_trait]
    impl TaskWriter for EchoWriter {
        async fn update(&self, id: Uuid, patch: UpdateTask) -> Result<Task, WriteError> {
            let mut task = task(id, "echo");
            patch.apply_to(&mut task);
            Ok(task)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_late_stale_response_does_not_clobber_newer_write() {
        let id = Uuid::new_v4();
        let (writer, mut senders) = GatedWriter::new(2);
        let store = Arc::new(OptimisticTaskStore::new(writer));
        store.load(vec![task(id, "Original")]);

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.update(id, title_patch("A")).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.update(id, title_patch("B")).await })
        };
        tokio::task::yield_now().await;

        // Both applied optimistically; the later write is the visible one.
        assert_eq!(store.get(id).unwrap().title, "B");

        // The second (newer) response lands first.
        let mut server_b = task(id, "B-from-server");
        server_b.updated_at = Utc::now();
        senders.remove(1).send(Ok(server_b)).unwrap();
        let second = second.await.unwrap().unwrap();
        assert!(matches!(second, UpdateOutcome::Committed(_)));
        assert_eq!(store.get(id).unwrap().title, "B-from-server");

        // The first (stale) response resolves afterwards and is discarded.
        senders.remove(0).send(Ok(task(id, "A-from-server"))).unwrap();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, UpdateOutcome::Superseded);
        assert_eq!(store.get(id).unwrap().title, "B-from-server");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failure_reverts_to_snapshot_and_reraises() {
        let id = Uuid::new_v4();
        let (writer, mut senders) = GatedWriter::new(1);
        let store = Arc::new(OptimisticTaskStore::new(writer));
        store.load(vec![task(id, "Original")]);

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.update(id, title_patch("Doomed")).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(store.get(id).unwrap().title, "Doomed");

        senders
            .remove(0)
            .send(Err(WriteError {
                status: 500,
                message: "boom".to_string(),
            }))
            .unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::Write(WriteError { status: 500, .. })));
        // Visible state snaps back to the pre-edit value.
        assert_eq!(store.get(id).unwrap().title, "Original");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_superseded_failure_does_not_revert() {
        let id = Uuid::new_v4();
        let (writer, mut senders) = GatedWriter::new(2);
        let store = Arc::new(OptimisticTaskStore::new(writer));
        store.load(vec![task(id, "Original")]);

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.update(id, title_patch("A")).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.update(id, title_patch("B")).await })
        };
        tokio::task::yield_now().await;

        // The stale write fails after being superseded: no revert, the newer
        // optimistic state stays visible.
        senders
            .remove(0)
            .send(Err(WriteError {
                status: 500,
                message: "boom".to_string(),
            }))
            .unwrap();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, UpdateOutcome::Superseded);
        assert_eq!(store.get(id).unwrap().title, "B");

        let mut server_b = task(id, "B");
        server_b.notes = Some("persisted".to_string());
        senders.remove(0).send(Ok(server_b)).unwrap();
        let second = second.await.unwrap().unwrap();
        assert!(matches!(second, UpdateOutcome::Committed(_)));
        assert_eq!(store.get(id).unwrap().notes.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_invalid_patch_rejected_before_local_apply() {
        let id = Uuid::new_v4();
        let store = OptimisticTaskStore::new(EchoWriter);
        store.load(vec![task(id, "Original")]);

        let err = store.update(id, UpdateTask::default()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyUpdate)
        ));
        assert_eq!(store.get(id).unwrap().title, "Original");

        let err = store
            .update(Uuid::new_v4(), title_patch("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTask));
    }

    #[tokio::test]
    async fn test_committed_update_adopts_server_payload() {
        let id = Uuid::new_v4();
        let store = OptimisticTaskStore::new(EchoWriter);
        store.load(vec![task(id, "Original")]);

        let outcome = store.update(id, title_patch("Renamed")).await.unwrap();
        match outcome {
            UpdateOutcome::Committed(task) => assert_eq!(task.title, "Renamed"),
            UpdateOutcome::Superseded => unreachable!("single write cannot be superseded"),
        }
        assert_eq!(store.get(id).unwrap().title, "Renamed");
    }
}
