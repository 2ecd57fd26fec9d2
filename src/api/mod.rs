//! Typed surface of the workbench API: operation definitions, wire types,
//! and one method per remote operation on [`crate::Client`].

pub mod compositions;
pub mod documents;
pub mod ops;
pub mod types;
