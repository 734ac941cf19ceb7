//! rusty-maint/crates/rm-core/src/lib.rs
//!
//! The central domain model and interface definitions for rusty-maint.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_link_strips_every_trailing_slash() {
        assert_eq!(qr_link("https://plant.example.com", "A001"), "https://plant.example.com/machine/A001");
        assert_eq!(qr_link("https://plant.example.com///", "A001"), "https://plant.example.com/machine/A001");
        assert_eq!(qr_link("http://10.0.0.5:8080/", "B7"), "http://10.0.0.5:8080/machine/B7");
    }

    #[test]
    fn machine_code_rules() {
        assert!(validate_code("A001").is_ok());
        assert!(validate_code("x").is_ok());
        assert!(matches!(validate_code(""), Err(AppError::Validation(_))));
        assert!(matches!(validate_code("A0012"), Err(AppError::Validation(_))));
        assert!(matches!(validate_code("../a"), Err(AppError::Validation(_))));
        assert!(matches!(validate_code("A 01"), Err(AppError::Validation(_))));
    }

    #[test]
    fn new_machine_trims_and_validates() {
        let m = NewMachine::new("  Press 1 ", " A001 ", Some("   "));
        assert_eq!(m.name, "Press 1");
        assert_eq!(m.code, "A001");
        assert_eq!(m.description, None);
        assert!(m.validate().is_ok());

        let blank_name = NewMachine::new(" ", "A001", None);
        assert!(matches!(blank_name.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn new_fault_requires_description() {
        assert!(NewFault::new("Leak", Some("Jon")).validate().is_ok());
        assert!(matches!(NewFault::new("  ", None).validate(), Err(AppError::Validation(_))));
        assert_eq!(NewFault::new("Leak", Some(" ")).technician, None);
    }

    #[test]
    fn fault_update_drops_blank_fields() {
        let update = FaultUpdate::from_form(Some("  "), Some("Jon"), Some("Resolved"), Some(""));
        assert_eq!(update.comment, None);
        assert_eq!(update.status.as_deref(), Some("Resolved"));
        assert_eq!(update.resolution, None);
        assert!(!update.is_empty());

        assert!(FaultUpdate::from_form(None, None, None, None).is_empty());
    }

    #[test]
    fn status_labels_round_trip_through_the_ui_set() {
        for status in FaultStatus::ALL {
            assert_eq!(FaultStatus::from_label(status.label()), Some(status));
        }
        assert_eq!(FaultStatus::from_label("Espera Repuestos"), None);
        assert_eq!(FaultStatus::Pending.to_string(), "Pending");
    }

    #[test]
    fn user_facing_errors() {
        assert!(AppError::machine_not_found("A001").is_user_facing());
        assert!(AppError::DuplicateCode("A001".into()).is_user_facing());
        assert!(!AppError::Storage("disk full".into()).is_user_facing());
        assert_eq!(AppError::fault_not_found(7).to_string(), "fault not found: 7");
    }
}
