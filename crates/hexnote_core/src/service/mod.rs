//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, search and publisher calls into the save,
//!   search, load and delete use-cases.
//! - Keep UI/transport layers decoupled from storage details.

pub mod entry_service;
pub mod tag_service;
