use async_trait::async_trait;
use attendance_core::{
    InMemoryStudentStore, RepoResult, SqliteStudentStore, Student, StudentId, StudentStore,
    SyncClient, SyncError, DEFAULT_STORE_TIMEOUT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counts calls that reach the wrapped store.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStudentStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StudentStore for CountingStore {
    async fn create(&self, name: &str) -> RepoResult<Student> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(name).await
    }

    async fn list(&self) -> RepoResult<Vec<Student>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list().await
    }

    async fn increment_attendance(&self, id: StudentId) -> RepoResult<Student> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.increment_attendance(id).await
    }
}

/// Never answers.
struct HangingStore;

#[async_trait]
impl StudentStore for HangingStore {
    async fn create(&self, _name: &str) -> RepoResult<Student> {
        std::future::pending().await
    }

    async fn list(&self) -> RepoResult<Vec<Student>> {
        std::future::pending().await
    }

    async fn increment_attendance(&self, _id: StudentId) -> RepoResult<Student> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn add_then_fetch_yields_one_trimmed_zero_count_record() {
    let client = SyncClient::new(Arc::new(SqliteStudentStore::open_in_memory().unwrap()));

    for raw in ["Alice", "  Bob", "Carol  ", "\tDan Smith\n"] {
        let before = client.fetch_all().await.unwrap();
        let added = client.add_student(raw).await.unwrap();
        let after = client.fetch_all().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        let matching: Vec<_> = after.iter().filter(|row| row.id == added.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, raw.trim());
        assert_eq!(matching[0].attendance_count, 0);
    }
}

#[tokio::test]
async fn blank_names_never_reach_the_store() {
    let store = Arc::new(CountingStore::default());
    let client = SyncClient::new(Arc::clone(&store));

    for raw in ["", " ", "\t\n", "   \r  "] {
        let err = client.add_student(raw).await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    assert_eq!(store.calls(), 0);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn mark_present_counts_up_sequentially() {
    let client = SyncClient::new(Arc::new(InMemoryStudentStore::new()));
    let alice = client.add_student("Alice").await.unwrap();

    let mut last = alice.attendance_count;
    for _ in 0..7 {
        let updated = client.mark_present(alice.id).await.unwrap();
        assert_eq!(updated.attendance_count, last + 1);
        last = updated.attendance_count;
    }
    assert_eq!(last, 7);
}

#[tokio::test]
async fn mark_present_on_missing_id_is_not_found() {
    let client = SyncClient::new(Arc::new(InMemoryStudentStore::new()));
    client.add_student("Alice").await.unwrap();

    let err = client.mark_present(404).await.unwrap_err();
    assert_eq!(err, SyncError::NotFound(404));
    assert!(!err.is_retryable());
    assert_eq!(client.fetch_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fetch_all_is_ordered_by_id() {
    let client = SyncClient::new(Arc::new(SqliteStudentStore::open_in_memory().unwrap()));
    let names = ["Zoe", "Adam", "Mia", "Bo"];
    for name in names {
        client.add_student(name).await.unwrap();
    }
    client.mark_present(3).await.unwrap();
    client.mark_present(1).await.unwrap();

    let ids: Vec<_> = client
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn unreachable_store_surfaces_retryable_unavailable() {
    let store = Arc::new(InMemoryStudentStore::new());
    let client = SyncClient::new(Arc::clone(&store));
    store.set_unreachable(true);

    let err = client.add_student("Carol").await.unwrap_err();
    assert!(matches!(err, SyncError::Unavailable(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        client.fetch_all().await,
        Err(SyncError::Unavailable(_))
    ));
}

#[tokio::test]
async fn hung_store_call_times_out_as_unavailable() {
    let client = SyncClient::new(Arc::new(HangingStore)).with_timeout(Duration::from_millis(50));
    assert_eq!(client.timeout(), Duration::from_millis(50));

    let started_at = Instant::now();
    let err = client.add_student("Alice").await.unwrap_err();
    assert!(matches!(err, SyncError::Unavailable(message) if message.contains("timed out")));
    assert!(started_at.elapsed() < DEFAULT_STORE_TIMEOUT);

    assert!(matches!(
        client.mark_present(1).await,
        Err(SyncError::Unavailable(_))
    ));
}

#[tokio::test]
async fn ui_representation_uses_camel_case_keys() {
    let client = SyncClient::new(Arc::new(InMemoryStudentStore::new()));
    let alice = client.add_student("Alice").await.unwrap();

    let json = serde_json::to_value(&alice).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "id": 1, "name": "Alice", "attendanceCount": 0 })
    );
}
