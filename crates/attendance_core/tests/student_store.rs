use attendance_core::db::open_db_in_memory;
use attendance_core::{
    InMemoryStudentStore, RepoError, SqliteStudentRepository, SqliteStudentStore,
    StudentRepository, StudentStore, StudentValidationError,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn create_assigns_id_and_zero_count() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);

    let alice = repo.create_student("  Alice  ").unwrap();
    let bob = repo.create_student("Bob").unwrap();

    assert_eq!(alice.id, 1);
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.attendance_count, 0);
    assert_eq!(bob.id, 2);
}

#[test]
fn create_rejects_blank_name_without_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);

    let err = repo.create_student(" \t").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(StudentValidationError::EmptyName)
    ));
    assert!(repo.list_students().unwrap().is_empty());
}

#[test]
fn ids_are_not_reused_after_row_removal() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);

    let first = repo.create_student("Alice").unwrap();
    conn.execute("DELETE FROM students WHERE id = ?1;", [first.id])
        .unwrap();
    let second = repo.create_student("Bob").unwrap();

    assert!(second.id > first.id);
}

#[test]
fn increment_adds_one_per_call() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);
    let alice = repo.create_student("Alice").unwrap();

    for expected in 1..=5 {
        let updated = repo.increment_attendance(alice.id).unwrap();
        assert_eq!(updated.attendance_count, expected);
        assert_eq!(updated.id, alice.id);
        assert_eq!(updated.name, "Alice");
    }
}

#[test]
fn increment_missing_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);
    repo.create_student("Alice").unwrap();

    let err = repo.increment_attendance(99).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(99)));
}

#[test]
fn list_is_ordered_by_id_regardless_of_updates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::new(&conn);
    let zed = repo.create_student("Zed").unwrap();
    let amy = repo.create_student("Amy").unwrap();
    let max = repo.create_student("Max").unwrap();

    repo.increment_attendance(max.id).unwrap();
    repo.increment_attendance(zed.id).unwrap();
    repo.increment_attendance(max.id).unwrap();

    let ids: Vec<_> = repo
        .list_students()
        .unwrap()
        .into_iter()
        .map(|student| student.id)
        .collect();
    assert_eq!(ids, vec![zed.id, amy.id, max.id]);
}

#[tokio::test]
async fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");

    {
        let store = SqliteStudentStore::open(&path).unwrap();
        let alice = store.create("Alice").await.unwrap();
        store.increment_attendance(alice.id).await.unwrap();
    }

    let reopened = SqliteStudentStore::open(&path).unwrap();
    let students = reopened.list().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name, "Alice");
    assert_eq!(students[0].attendance_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_not_lost() {
    let store = SqliteStudentStore::open_in_memory().unwrap();
    let alice_id = store.create("Alice").await.unwrap().id;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                store.increment_attendance(alice_id).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let students = store.list().await.unwrap();
    assert_eq!(students[0].attendance_count, 200);
}

#[tokio::test]
async fn abandoned_sqlite_write_is_rolled_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let store = SqliteStudentStore::open(&path).unwrap();

    let locker = rusqlite::Connection::open(&path).unwrap();
    locker.execute_batch("BEGIN EXCLUSIVE;").unwrap();
    let outcome = tokio::time::timeout(Duration::from_millis(100), store.create("Carol")).await;
    assert!(outcome.is_err());
    locker.execute_batch("COMMIT;").unwrap();

    // Queues behind the abandoned worker on the connection mutex.
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(store.create("Carol").await.unwrap().id, 1);
}

#[tokio::test]
async fn stores_are_interchangeable_behind_trait_object() {
    let stores: Vec<Arc<dyn StudentStore>> = vec![
        Arc::new(InMemoryStudentStore::new()),
        Arc::new(SqliteStudentStore::open_in_memory().unwrap()),
    ];

    for store in stores {
        let bob = store.create(" Bob ").await.unwrap();
        let alice = store.create("Alice").await.unwrap();
        store.increment_attendance(alice.id).await.unwrap();
        store.increment_attendance(alice.id).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, bob.id);
        assert_eq!(listed[0].name, "Bob");
        assert_eq!(listed[1].attendance_count, 2);

        assert!(matches!(
            store.increment_attendance(1_000).await,
            Err(RepoError::NotFound(1_000))
        ));
        assert!(matches!(
            store.create("").await,
            Err(RepoError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn unreachable_memory_store_reports_unavailable() {
    let store = InMemoryStudentStore::new();
    store.create("Alice").await.unwrap();
    store.set_unreachable(true);

    let err = store.list().await.unwrap_err();
    assert!(err.is_unavailable());

    store.set_unreachable(false);
    assert_eq!(store.list().await.unwrap().len(), 1);
}
