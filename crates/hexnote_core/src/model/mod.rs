//! Journal domain model.
//!
//! # Responsibility
//! - Define the persisted entry record and its fixed annotation set.
//! - Define the tag registry record.
//!
//! # Invariants
//! - Entry ids are assigned by the store and never reused.
//! - Annotations are a closed record, not an open key/value bag.

pub mod entry;
