//! Synthesis of the CRUD schema from the validated user types.

pub mod builtins;
mod generate;
pub mod names;
mod render;
pub mod search;

pub use generate::{GeneratedSchema, RootField, RootFieldKind};
pub(crate) use generate::generate;
