pub mod auth;
pub mod error_sim;
pub mod latency;
pub mod logger;
pub mod powered_by;
pub mod rbac;
