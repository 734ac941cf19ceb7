//! Shared fixtures for the end-to-end tests in `tests/`.

use std::path::Path;
use std::sync::Arc;

use actix_web::web;
use rm_api::AppState;
use rm_core::traits::{MaintenanceRepo, QrStore};
use rm_db_sqlite::SqliteMaintenanceRepo;
use rm_qr_local::LocalQrStore;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://plant.example.com/";

/// A fresh store and QR directory per test.
pub struct Fixture {
    pub state: web::Data<AppState>,
    pub dir: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let qr = LocalQrStore::new(dir.path().join("qrcodes"), "/static/qrcodes".into());
        Self::with_qr(dir, Arc::new(qr)).await
    }

    /// QR output dir is a regular file, so every generation fails.
    pub async fn with_broken_qr() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("qrcodes");
        std::fs::write(&blocker, b"not a directory").expect("blocker file");
        let qr = LocalQrStore::new(blocker, "/static/qrcodes".into());
        Self::with_qr(dir, Arc::new(qr)).await
    }

    async fn with_qr(dir: TempDir, qr: Arc<dyn QrStore>) -> Self {
        let repo: Arc<dyn MaintenanceRepo> =
            Arc::new(SqliteMaintenanceRepo::in_memory().await.expect("in-memory store"));
        let state = web::Data::new(AppState::new(repo, qr, BASE_URL));
        Self { state, dir }
    }

    pub fn repo(&self) -> &dyn MaintenanceRepo {
        self.state.repo.as_ref()
    }

    pub fn qr_path(&self, code: &str) -> std::path::PathBuf {
        self.state.qr.artifact_path(code)
    }
}

/// Decodes the single QR symbol in a PNG file.
pub fn decode_qr(path: &Path) -> String {
    let img = image::open(path).expect("readable png").to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
    grids[0].decode().expect("decodable QR").1
}
