//! Core domain models for deid
//!
//! This crate contains:
//! - Tabular records (Cell, Dataset)
//! - Recognized entity spans and placeholder tokens
//! - The freetext category list
//! - The shared error taxonomy

pub mod category;
pub mod entity;
pub mod error;
pub mod record;

pub use category::{FREETEXT_CATEGORIES, is_freetext_category};
pub use entity::{ANONYM_PLACEHOLDER, CONTACT_PLACEHOLDER, EntityKind, EntitySpan};
pub use error::{Error, Result};
pub use record::{Cell, Dataset, MIN_TEXT_LEN};

/// Progress sink shared by long-running operations: `(fraction in [0, 1], message)`.
///
/// May be invoked from any thread. The callback may borrow from the caller
/// for `'a`.
pub type ProgressFn<'a> = dyn Fn(f64, &str) + Send + Sync + 'a;
