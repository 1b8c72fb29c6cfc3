//! Tag registry: tag metadata and named enumeration values.
//!
//! # Responsibility
//! - Load tag definitions and serve name resolution for tags and values.
//!
//! # Invariants
//! - Registry state is read-mostly; source replacement is an atomic swap.

pub mod definitions;
pub mod lookup;
