//! In-memory physical layer consumed by the logical schemas.
//!
//! # Responsibility
//! - Realize the tagged element tree contract (scalar/vector/collection).
//! - Provide the record container (header kind + body collection).
//!
//! # Invariants
//! - The tree does not enforce tag uniqueness.
//! - Byte-stream encoding is not part of this layer.

pub mod element;
pub mod physical_type;
pub mod record;
