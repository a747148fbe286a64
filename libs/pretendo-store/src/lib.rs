//! In-memory record storage: the collection store itself, field validation,
//! special-field resolution, and relationship expansion.

pub mod expander;
pub mod idkey;
pub mod special_fields;
pub mod store;
pub mod validator;

pub use expander::{expand, ExpansionSchema, RelatedLookup};
pub use pretendo_query::Record;
pub use special_fields::SpecialFieldContext;
pub use store::{ListResult, Store};
pub use validator::Mode as ValidationMode;
