//! # Domain Models
//!
//! These structs represent the core entities of rusty-maint: machines,
//! the faults reported against them and the comment log of each fault.
//! Identities are SQLite row ids, assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Maximum length of a machine code (the public identifier printed on the QR).
pub const CODE_MAX_LEN: usize = 4;
pub const NAME_MAX_LEN: usize = 100;
pub const PERSON_MAX_LEN: usize = 50;
pub const STATUS_MAX_LEN: usize = 30;

/// Path template the QR payload points at, relative to the public base URL.
pub const MACHINE_LINK_PREFIX: &str = "/machine/";

/// A registered machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    /// Short unique code (e.g. "A001"); never changes once assigned
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A fault reported against a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub id: i64,
    pub machine_id: i64,
    pub description: String,
    /// Free-form label; see [`FaultStatus`] for the values the UI offers
    pub status: String,
    pub technician: Option<String>,
    pub resolution: Option<String>,
    pub reported_at: DateTime<Utc>,
}

/// One entry of a fault's comment log. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub fault_id: i64,
    pub text: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status labels offered by the UI.
///
/// The store accepts any label; this set only drives the select box and the
/// initial value of a new fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultStatus {
    Pending,
    InProgress,
    WaitingForParts,
    Resolved,
}

impl FaultStatus {
    pub const ALL: [FaultStatus; 4] = [
        FaultStatus::Pending,
        FaultStatus::InProgress,
        FaultStatus::WaitingForParts,
        FaultStatus::Resolved,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FaultStatus::Pending => "Pending",
            FaultStatus::InProgress => "In Progress",
            FaultStatus::WaitingForParts => "Waiting for Parts",
            FaultStatus::Resolved => "Resolved",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Input for `create_machine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMachine {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

impl NewMachine {
    /// Trims every field and turns a blank description into `None`.
    pub fn new(name: &str, code: &str, description: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            description: non_blank(description),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AppError::Validation("machine name is required".into()));
        }
        check_len("machine name", &self.name, NAME_MAX_LEN)?;
        validate_code(&self.code)
    }
}

/// Input for `create_fault`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFault {
    pub description: String,
    pub technician: Option<String>,
}

impl NewFault {
    pub fn new(description: &str, technician: Option<&str>) -> Self {
        Self {
            description: description.trim().to_string(),
            technician: non_blank(technician),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.is_empty() {
            return Err(AppError::Validation("fault description is required".into()));
        }
        match &self.technician {
            Some(t) => check_len("technician", t, PERSON_MAX_LEN),
            None => Ok(()),
        }
    }
}

/// Input for `append_comment`. A blank text means "nothing to append".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub author: Option<String>,
}

impl NewComment {
    pub fn new(text: &str, author: Option<&str>) -> Self {
        Self { text: text.trim().to_string(), author: non_blank(author) }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.author {
            Some(a) => check_len("comment author", a, PERSON_MAX_LEN),
            None => Ok(()),
        }
    }
}

/// Everything the comment/update form can change on a fault at once.
/// Absent parts are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultUpdate {
    pub comment: Option<NewComment>,
    pub status: Option<String>,
    pub resolution: Option<String>,
}

impl FaultUpdate {
    /// Builds an update from raw form fields, dropping blank ones.
    pub fn from_form(
        comment: Option<&str>,
        author: Option<&str>,
        status: Option<&str>,
        resolution: Option<&str>,
    ) -> Self {
        let comment = comment
            .map(|text| NewComment::new(text, author))
            .filter(|c| !c.is_blank());
        Self {
            comment,
            status: non_blank(status),
            resolution: non_blank(resolution),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.status.is_none() && self.resolution.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(c) = &self.comment {
            c.validate()?;
        }
        if let Some(s) = &self.status {
            check_len("status", s, STATUS_MAX_LEN)?;
        }
        Ok(())
    }
}

/// A fault together with its comment log (oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultDetail {
    pub fault: Fault,
    pub comments: Vec<Comment>,
}

/// A machine together with its faults (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineDetail {
    pub machine: Machine,
    pub faults: Vec<FaultDetail>,
}

/// Checks that a machine code is 1..=4 ASCII alphanumerics.
///
/// Codes end up in URLs and file names, so nothing else gets through.
pub fn validate_code(code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(AppError::Validation("machine code is required".into()));
    }
    if code.chars().count() > CODE_MAX_LEN {
        return Err(AppError::Validation(format!(
            "machine code must be at most {CODE_MAX_LEN} characters"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(
            "machine code may only contain letters and digits".into(),
        ));
    }
    Ok(())
}

/// Builds the public link encoded in a machine's QR image.
pub fn qr_link(base_url: &str, code: &str) -> String {
    format!("{}{}{}", base_url.trim_end_matches('/'), MACHINE_LINK_PREFIX, code)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}
