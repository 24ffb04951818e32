pub mod dominator;
pub mod verifier;

pub use dominator::DominatorInfo;
pub use verifier::{verify, Diagnostic, VerifierError};
