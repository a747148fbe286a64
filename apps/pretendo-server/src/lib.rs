//! The binary's supporting library: shared state, middleware stack, route
//! handlers, the custom-route script sandbox, and the request-id plumbing.
//! `main.rs` is the thin CLI wrapper around [`server::start`].

pub mod middleware;
pub mod request_id;
pub mod routes;
pub mod script;
pub mod server;
pub mod state;
