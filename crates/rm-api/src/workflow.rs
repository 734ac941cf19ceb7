//! # Workflows
//!
//! The operations behind each route, independent of HTTP. Handlers decide how
//! an `AppError` is presented (redirect with notice or error page).

use std::sync::Arc;

use rm_core::error::{AppError, Result};
use rm_core::models::{Fault, FaultUpdate, Machine, MachineDetail, NewFault, NewMachine};
use rm_core::traits::{MaintenanceRepo, QrStore};

/// State shared across all actix-web workers.
pub struct AppState {
    pub repo: Arc<dyn MaintenanceRepo>,
    pub qr: Arc<dyn QrStore>,
    /// Origin encoded in QR links (e.g. "https://plant.example.com")
    pub public_base_url: String,
}

impl AppState {
    pub fn new(repo: Arc<dyn MaintenanceRepo>, qr: Arc<dyn QrStore>, public_base_url: impl Into<String>) -> Self {
        Self { repo, qr, public_base_url: public_base_url.into() }
    }
}

/// Resolves a submitted code. A miss is `NotFound`, never fatal.
pub async fn lookup_by_code(state: &AppState, code: &str) -> Result<Machine> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::machine_not_found(code));
    }
    state.repo.get_machine_by_code(code).await
}

pub async fn machine_view(state: &AppState, code: &str) -> Result<MachineDetail> {
    state.repo.machine_detail(code).await
}

pub async fn report_fault(state: &AppState, code: &str, new: NewFault) -> Result<Fault> {
    let machine = state.repo.get_machine_by_code(code).await?;
    let fault = state.repo.create_fault(machine.id, new).await?;
    log::info!("fault #{} reported on {}", fault.id, machine.code);
    Ok(fault)
}

/// Applies comment/status/resolution in one transaction and returns the
/// updated fault with its owning machine, for the redirect.
pub async fn comment_or_update(state: &AppState, fault_id: i64, update: FaultUpdate) -> Result<(Fault, Machine)> {
    let fault = state.repo.apply_fault_update(fault_id, update).await?;
    let machine = state.repo.get_machine(fault.machine_id).await?;
    log::info!("fault #{} on {} updated, status {:?}", fault.id, machine.code, fault.status);
    Ok((fault, machine))
}

/// Machine owning `fault_id`, used to send a rejected update back to its page.
pub async fn owning_machine(state: &AppState, fault_id: i64) -> Result<Machine> {
    let fault = state.repo.get_fault(fault_id).await?;
    state.repo.get_machine(fault.machine_id).await
}

/// Registers a machine and writes its QR image as one unit.
///
/// The image is generated inside the insert transaction; if generation or the
/// commit fails, the row is rolled back and any written image is removed.
pub async fn admin_create(state: &AppState, new: NewMachine) -> Result<Machine> {
    new.validate()?;

    match state.repo.get_machine_by_code(&new.code).await {
        Ok(_) => return Err(AppError::DuplicateCode(new.code)),
        Err(AppError::NotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    let code = new.code.clone();
    let hook = |machine: &Machine| {
        state
            .qr
            .generate(&machine.code, &state.public_base_url)
            .map(|_| ())
    };

    match state.repo.create_machine_with(new, &hook).await {
        Ok(machine) => {
            log::info!("machine {} ({}) registered", machine.code, machine.name);
            Ok(machine)
        }
        // The code belongs to someone else: their image must stay.
        Err(e @ AppError::DuplicateCode(_)) => Err(e),
        Err(e) => {
            log::error!("creating machine {code} failed, rolled back: {e}");
            if let Err(cleanup) = state.qr.discard(&code) {
                log::warn!("could not remove qr image for {code}: {cleanup}");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use rm_core::models::NewComment;
    use rm_core::traits::MockQrStore;
    use rm_db_sqlite::SqliteMaintenanceRepo;

    async fn state_with(qr: MockQrStore) -> AppState {
        let repo = SqliteMaintenanceRepo::in_memory().await.unwrap();
        AppState::new(Arc::new(repo), Arc::new(qr), "https://plant.example.com/")
    }

    fn working_qr() -> MockQrStore {
        let mut qr = MockQrStore::new();
        qr.expect_generate()
            .returning(|code, _| Ok(PathBuf::from(format!("static/qrcodes/{code}.png"))));
        qr
    }

    #[tokio::test]
    async fn test_create_generates_qr_with_configured_base() {
        let mut qr = MockQrStore::new();
        qr.expect_generate()
            .withf(|code: &str, base: &str| code == "A001" && base == "https://plant.example.com/")
            .times(1)
            .returning(|_, _| Ok(PathBuf::from("static/qrcodes/A001.png")));
        let state = state_with(qr).await;

        let machine = admin_create(&state, NewMachine::new("Press 1", "A001", None)).await.unwrap();
        assert_eq!(machine.code, "A001");
        assert_eq!(lookup_by_code(&state, " A001 ").await.unwrap(), machine);
    }

    #[tokio::test]
    async fn test_duplicate_code_skips_qr_and_keeps_original() {
        let mut qr = working_qr();
        qr.expect_discard().never();
        let state = state_with(qr).await;

        let original = admin_create(&state, NewMachine::new("Press 1", "A001", None)).await.unwrap();
        let err = admin_create(&state, NewMachine::new("Other", "A001", Some("x"))).await.unwrap_err();
        assert_eq!(err, AppError::DuplicateCode("A001".into()));
        assert_eq!(state.repo.get_machine_by_code("A001").await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_qr_failure_rolls_back_machine() {
        let mut qr = MockQrStore::new();
        qr.expect_generate()
            .times(1)
            .returning(|_, _| Err(AppError::QrGeneration("disk full".into())));
        qr.expect_discard()
            .withf(|code: &str| code == "A001")
            .times(1)
            .returning(|_| Ok(()));
        let state = state_with(qr).await;

        let err = admin_create(&state, NewMachine::new("Press 1", "A001", None)).await.unwrap_err();
        assert_eq!(err, AppError::QrGeneration("disk full".into()));
        assert!(matches!(
            state.repo.get_machine_by_code("A001").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_machine_never_reaches_storage() {
        let mut qr = MockQrStore::new();
        qr.expect_generate().never();
        let state = state_with(qr).await;

        let err = admin_create(&state, NewMachine::new("", "A001", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.repo.list_machines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_miss_changes_nothing() {
        let state = state_with(MockQrStore::new()).await;
        assert!(matches!(lookup_by_code(&state, "ZZZZ").await, Err(AppError::NotFound { .. })));
        assert!(matches!(lookup_by_code(&state, "   ").await, Err(AppError::NotFound { .. })));
        assert!(state.repo.list_machines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_then_update_round_trip() {
        let state = state_with(working_qr()).await;
        admin_create(&state, NewMachine::new("Press 1", "A001", None)).await.unwrap();

        let fault = report_fault(&state, "A001", NewFault::new("Leak", Some("Jon"))).await.unwrap();
        assert_eq!(fault.status, "Pending");

        let update = FaultUpdate {
            comment: Some(NewComment::new("Ordered seal kit", Some("Jon"))),
            status: Some("Waiting for Parts".into()),
            resolution: None,
        };
        let (updated, machine) = comment_or_update(&state, fault.id, update).await.unwrap();
        assert_eq!(updated.status, "Waiting for Parts");
        assert_eq!(machine.code, "A001");

        let detail = machine_view(&state, "A001").await.unwrap();
        assert_eq!(detail.faults.len(), 1);
        assert_eq!(detail.faults[0].comments.len(), 1);
        assert_eq!(owning_machine(&state, fault.id).await.unwrap().code, "A001");
    }

    #[tokio::test]
    async fn test_report_on_unknown_machine() {
        let state = state_with(MockQrStore::new()).await;
        let err = report_fault(&state, "NOPE", NewFault::new("Leak", None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "machine", .. }));
    }
}
