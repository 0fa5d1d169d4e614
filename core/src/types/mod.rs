//! Data model shared by the monitor and the verifier.

pub mod object;
pub mod scope;

pub use object::ConfigObject;
pub use scope::{ScopeDeclaration, ScopeSnapshot};
