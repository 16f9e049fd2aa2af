//! Storage layer for deid
//!
//! This crate provides:
//! - The persisted blacklist (one term per line)
//! - Reading and writing datasets as CSV

pub mod csv_io;
pub mod error;
pub mod terms;

pub use csv_io::{parse_cell, parse_input_list, read_dataset, write_dataset};
pub use error::{Result, StorageError};
pub use terms::{TermStore, combine};
