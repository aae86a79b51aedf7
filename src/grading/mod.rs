//! Grading core: score bounds, letter-grade banding, submission status
//! transitions and aggregate statistics.
//!
//! Everything here is synchronous and free of I/O. Records come in through
//! [`crate::store`] and summaries go out through [`crate::output`].

pub mod aggregate;
pub mod grade;
pub mod score;
pub mod status;
pub mod types;
pub mod utility;
