//! Repository layer abstractions and the SQLite implementation.
//!
//! # Responsibility
//! - Define entry and tag registry data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every mutating call is one `IMMEDIATE` transaction, so concurrent
//!   writers on the same entry serialize instead of interleaving.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod entry_repo;
pub mod tag_repo;
