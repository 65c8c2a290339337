pub mod verification_ledger;

pub use verification_ledger::{VerificationLedger, format_audit_line};
