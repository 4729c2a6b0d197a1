//! Entry search entry points.
//!
//! # Responsibility
//! - Answer substring queries over rendered HTML and tags.
//! - Keep ordering identical to the store's full listing.

pub mod substring;
