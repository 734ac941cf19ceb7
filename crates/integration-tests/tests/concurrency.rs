//! Two technicians registering the same code at once: one wins.

use std::sync::Arc;

use rm_api::workflow::{admin_create, AppState};
use rm_core::{AppError, MaintenanceRepo, NewMachine, QrStore};
use rm_db_sqlite::SqliteMaintenanceRepo;
use rm_qr_local::LocalQrStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_code_from_two_callers_yields_one_machine() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("maint.db").display());
    let repo: Arc<dyn MaintenanceRepo> = Arc::new(SqliteMaintenanceRepo::connect(&url, 4).await.unwrap());
    let qr: Arc<dyn QrStore> = Arc::new(LocalQrStore::new(dir.path().join("qrcodes"), "/static/qrcodes".into()));
    let state = Arc::new(AppState::new(repo, qr, "https://plant.example.com"));

    let attempts: Vec<_> = ["Press left", "Press right"]
        .into_iter()
        .map(|name| {
            let state = Arc::clone(&state);
            tokio::spawn(async move { admin_create(&state, NewMachine::new(name, "A001", None)).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for attempt in attempts {
        outcomes.push(attempt.await.unwrap());
    }

    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, Err(AppError::DuplicateCode(code)) if code == "A001"))
        .count();
    assert_eq!((wins, duplicates), (1, 1));

    assert_eq!(state.repo.list_machines().await.unwrap().len(), 1);
    assert!(state.qr.artifact_path("A001").exists());
    state.repo.close().await;
}
