//! Bearer-token issuance, verification, and revocation, plus username and
//! password authentication against caller-supplied candidate records.

pub mod service;
pub mod subject;

pub use service::{AuthFields, AuthService};
pub use subject::Subject;
