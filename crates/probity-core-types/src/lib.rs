//! Core types shared across Probity facilities
//!
//! This crate provides foundational types used by the assertion context,
//! the reporting adapters and the logging facility:
//!
//! - **Scope identity**: ScopeId, identifying one assertion-context lifetime
//! - **Schema constants**: Canonical field keys and event names

pub mod schema;
pub mod scope;

pub use scope::ScopeId;
