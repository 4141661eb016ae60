//! Common test utilities for query engine testing.
//!
//! - [`fixtures`] - Student, department and faculty documents

pub mod fixtures;
