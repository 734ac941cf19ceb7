//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Comment, Fault, FaultUpdate, Machine, MachineDetail, NewComment, NewFault, NewMachine,
};

/// Hook run inside the machine-creation transaction. An error rolls the
/// insert back.
pub type InsertHook<'a> = &'a (dyn Fn(&Machine) -> Result<()> + Send + Sync);

/// Data persistence contract for machines, faults and comments.
///
/// Every mutating call is atomic: on error the store is left unchanged.
#[async_trait]
pub trait MaintenanceRepo: Send + Sync {
    // Machine Operations
    async fn create_machine(&self, new: NewMachine) -> Result<Machine> {
        self.create_machine_with(new, &|_: &Machine| Ok(())).await
    }
    /// Inserts the machine, runs `on_insert` and commits only if it succeeds.
    /// A taken code yields `DuplicateCode` from the unique constraint.
    async fn create_machine_with(&self, new: NewMachine, on_insert: InsertHook<'_>) -> Result<Machine>;
    async fn get_machine_by_code(&self, code: &str) -> Result<Machine>;
    async fn get_machine(&self, id: i64) -> Result<Machine>;
    async fn list_machines(&self) -> Result<Vec<Machine>>;
    async fn machine_detail(&self, code: &str) -> Result<MachineDetail>;

    // Fault Operations
    async fn create_fault(&self, machine_id: i64, new: NewFault) -> Result<Fault>;
    async fn get_fault(&self, id: i64) -> Result<Fault>;
    /// Overwrites the status with any label; no transition is rejected.
    async fn set_fault_status(&self, fault_id: i64, status: &str) -> Result<Fault>;
    async fn set_fault_resolution(&self, fault_id: i64, resolution: Option<&str>) -> Result<Fault>;
    /// Comment, status and resolution in a single transaction.
    async fn apply_fault_update(&self, fault_id: i64, update: FaultUpdate) -> Result<Fault>;

    // Comment Operations
    /// Returns `None` without writing when the text is blank.
    async fn append_comment(&self, fault_id: i64, comment: NewComment) -> Result<Option<Comment>>;
    async fn list_comments(&self, fault_id: i64) -> Result<Vec<Comment>>;

    /// Releases the underlying connections. Called once on shutdown.
    async fn close(&self) {}
}

/// QR artifact contract: one image per machine code.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait QrStore: Send + Sync {
    /// Encodes `qr_link(base_url, code)` and writes the image for `code`.
    fn generate(&self, code: &str, base_url: &str) -> Result<PathBuf>;
    /// Where the image for `code` lives on disk.
    fn artifact_path(&self, code: &str) -> PathBuf;
    /// Public URL of the image for `code`.
    fn url(&self, code: &str) -> String;
    /// Removes the image for `code`; a missing file is not an error.
    fn discard(&self, code: &str) -> Result<()>;
}
