use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::database::VectorDatabase;
use crate::error::{VectorDbError, VectorDbResult};

/// Shared handle to a live backend instance
pub type InstanceHandle = Arc<dyn VectorDatabase>;

/// A registered instance plus the lock serializing its release.
struct Entry {
    handle: InstanceHandle,
    releasing: Mutex<()>,
}

/// Concurrency-safe map of caller-chosen names to live backend instances.
///
/// The map lock guards membership only and is never held across a backend
/// call, except for the factory in [`create`](Self::create). Each entry has
/// its own release lock, held while [`cleanup`](Self::cleanup) runs the
/// backend release. Lock order is entry then map.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, Arc<Entry>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new instance built by `factory`.
    ///
    /// The write lock is held while the factory runs, so two concurrent
    /// creates of the same name yield exactly one success.
    pub async fn create<F, Fut>(&self, name: &str, factory: F) -> VectorDbResult<InstanceHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VectorDbResult<InstanceHandle>>,
    {
        let mut instances = self.instances.write().await;
        if instances.contains_key(name) {
            return Err(VectorDbError::AlreadyExists(name.to_string()));
        }

        let handle = factory().await?;
        instances.insert(
            name.to_string(),
            Arc::new(Entry {
                handle: Arc::clone(&handle),
                releasing: Mutex::new(()),
            }),
        );
        info!(instance = %name, kind = %handle.kind(), "Registered vector database");
        Ok(handle)
    }

    async fn entry(&self, name: &str) -> VectorDbResult<Arc<Entry>> {
        self.instances
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| VectorDbError::InstanceNotFound(name.to_string()))
    }

    async fn is_current(&self, name: &str, entry: &Arc<Entry>) -> bool {
        self.instances
            .read()
            .await
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    /// Waits while the same name is being cleaned up; other names are unaffected.
    pub async fn get(&self, name: &str) -> VectorDbResult<InstanceHandle> {
        let entry = self.entry(name).await?;
        let _settled = entry.releasing.lock().await;
        if !self.is_current(name, &entry).await {
            return Err(VectorDbError::InstanceNotFound(name.to_string()));
        }
        Ok(Arc::clone(&entry.handle))
    }

    /// Unregister an instance and hand it back so the caller can release it
    /// outside the lock.
    pub async fn remove(&self, name: &str) -> VectorDbResult<InstanceHandle> {
        let entry = self
            .instances
            .write()
            .await
            .remove(name)
            .ok_or_else(|| VectorDbError::InstanceNotFound(name.to_string()))?;
        info!(instance = %name, "Unregistered vector database");
        Ok(Arc::clone(&entry.handle))
    }

    /// Run `release` on an instance and unregister it, as one step.
    ///
    /// Only this name's release lock is held while `release` runs. The entry
    /// is removed only if `release` succeeds; on failure the instance stays
    /// registered and the error is returned.
    pub async fn cleanup<F, Fut>(&self, name: &str, release: F) -> VectorDbResult<()>
    where
        F: FnOnce(InstanceHandle) -> Fut,
        Fut: Future<Output = VectorDbResult<()>>,
    {
        let entry = self.entry(name).await?;
        let _releasing = entry.releasing.lock().await;
        // A concurrent cleanup of the same name may have finished first.
        if !self.is_current(name, &entry).await {
            return Err(VectorDbError::InstanceNotFound(name.to_string()));
        }

        release(Arc::clone(&entry.handle)).await?;

        let mut instances = self.instances.write().await;
        if instances.get(name).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
            instances.remove(name);
        }
        info!(instance = %name, "Cleaned up and removed vector database");
        Ok(())
    }

    /// Point-in-time copy of all instances, sorted by name. Instances whose
    /// release is still running are included.
    pub async fn enumerate(&self) -> Vec<(String, InstanceHandle)> {
        let mut snapshot: Vec<(String, InstanceHandle)> = self
            .instances
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.handle)))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }

    /// Remove every instance, returning them for release. Does not wait for
    /// a cleanup already in progress.
    pub async fn drain(&self) -> Vec<(String, InstanceHandle)> {
        let mut drained: Vec<(String, InstanceHandle)> = self
            .instances
            .write()
            .await
            .drain()
            .map(|(name, entry)| (name, Arc::clone(&entry.handle)))
            .collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryDatabase;
    use crate::database::MockVectorDatabase;
    use crate::error::ErrorKind;
    use crate::models::BackendKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    /// Handles are not `Debug`, so `unwrap_err` is unavailable on these results.
    fn error_of(result: VectorDbResult<InstanceHandle>) -> VectorDbError {
        match result {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        }
    }

    fn memory(collection: &str) -> VectorDbResult<InstanceHandle> {
        Ok(Arc::new(InMemoryDatabase::new(collection)))
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let registry = InstanceRegistry::new();

        registry.create("db1", || async { memory("Docs") }).await.unwrap();
        assert_eq!(registry.get("db1").await.unwrap().collection_name(), "Docs");

        let removed = registry.remove("db1").await.unwrap();
        assert_eq!(removed.kind(), BackendKind::Mock);
        assert_eq!(error_of(registry.get("db1").await).kind(), ErrorKind::NotFound);
        assert_eq!(error_of(registry.remove("db1").await).kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails_without_running_factory() {
        let registry = InstanceRegistry::new();
        registry.create("db1", || async { memory("A") }).await.unwrap();

        let ran = AtomicUsize::new(0);
        let err = error_of(
            registry
                .create("db1", || async {
                    ran.fetch_add(1, Ordering::SeqCst);
                    memory("B")
                })
                .await,
        );
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(registry.get("db1").await.unwrap().collection_name(), "A");
    }

    #[tokio::test]
    async fn test_failed_factory_registers_nothing() {
        let registry = InstanceRegistry::new();

        let err = error_of(
            registry
                .create("db1", || async { Err(VectorDbError::backend("boom")) })
                .await,
        );
        assert_eq!(err.to_string(), "boom");
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_of_same_name_yield_one_success() {
        let registry = Arc::new(InstanceRegistry::new());
        let built = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let built = Arc::clone(&built);
                tokio::spawn(async move {
                    registry
                        .create("shared", || async move {
                            built.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            memory(&format!("C{i}"))
                        })
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::AlreadyExists),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_of_distinct_names_all_succeed() {
        let registry = Arc::new(InstanceRegistry::new());

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .create(&format!("db{i}"), || async { memory("Docs") })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let names: Vec<String> = registry.enumerate().await.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 20);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_on_success() {
        let registry = InstanceRegistry::new();

        let mut failing = MockVectorDatabase::new();
        failing.expect_kind().return_const(BackendKind::Mock);
        failing
            .expect_cleanup()
            .times(1)
            .returning(|| Err(VectorDbError::backend("disk busy")));
        let failing: InstanceHandle = Arc::new(failing);
        registry
            .create("stuck", || async move { Ok(failing) })
            .await
            .unwrap();

        let err = registry
            .cleanup("stuck", |db| async move { db.cleanup().await })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk busy");
        assert!(registry.get("stuck").await.is_ok());

        registry.create("db1", || async { memory("Docs") }).await.unwrap();
        registry
            .cleanup("db1", |db| async move { db.cleanup().await })
            .await
            .unwrap();
        assert_eq!(error_of(registry.get("db1").await).kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_live_map() {
        let registry = InstanceRegistry::new();
        registry.create("a", || async { memory("Docs") }).await.unwrap();

        let snapshot = registry.enumerate().await;
        registry.remove("a").await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(registry.enumerate().await.is_empty());
    }

    #[tokio::test]
    async fn test_drain_empties_registry() {
        let registry = InstanceRegistry::new();
        registry.create("b", || async { memory("Docs") }).await.unwrap();
        registry.create("a", || async { memory("Docs") }).await.unwrap();

        let drained = registry.drain().await;
        let names: Vec<_> = drained.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_stalled_cleanup_does_not_block_other_instances() {
        let registry = Arc::new(InstanceRegistry::new());
        registry.create("slow", || async { memory("Slow") }).await.unwrap();
        registry.create("fast", || async { memory("Fast") }).await.unwrap();

        let (started_tx, started_rx) = oneshot::channel();
        let stuck = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move {
                registry
                    .cleanup("slow", |_| async move {
                        let _ = started_tx.send(());
                        std::future::pending::<VectorDbResult<()>>().await
                    })
                    .await
            }
        });
        started_rx.await.unwrap();

        let fast = timeout(Duration::from_secs(1), registry.get("fast"))
            .await
            .expect("lookup of another instance must not wait")
            .unwrap();
        assert_eq!(fast.count_documents().await.unwrap(), 0);
        assert_eq!(
            timeout(Duration::from_secs(1), registry.len()).await.unwrap(),
            2
        );

        let listed: Vec<String> = registry.enumerate().await.into_iter().map(|(name, _)| name).collect();
        assert_eq!(listed, ["fast", "slow"]);

        // The same name waits for its cleanup to settle.
        assert!(timeout(Duration::from_millis(50), registry.get("slow")).await.is_err());

        stuck.abort();
        let _ = stuck.await;
        assert!(registry.get("slow").await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_after_cleanup_sees_nothing() {
        let registry = Arc::new(InstanceRegistry::new());
        registry.create("db1", || async { memory("Docs") }).await.unwrap();

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let cleanup = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move {
                registry
                    .cleanup("db1", |_| async move {
                        let _ = release_rx.await;
                        Ok(())
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;

        let waiting = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.get("db1").await.map(|_| ()) }
        });
        tokio::task::yield_now().await;

        release_tx.send(()).unwrap();
        cleanup.await.unwrap().unwrap();
        let err = waiting.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(registry.is_empty().await);
    }
}
