pub mod db;
pub mod sandbox;

pub use db::{DatabaseScriptDb, ScriptDb};
pub use sandbox::{RhaiSandbox, ScriptRequest, ScriptResponse, ScriptSandbox};
