pub mod admin;
pub mod auth;
pub mod custom;
pub mod docs;
pub mod envelope;
pub mod relation;
pub mod resource;
pub mod root;
