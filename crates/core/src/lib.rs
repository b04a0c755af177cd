//! Property validation and assessment intelligence.
//!
//! Pure domain logic with no I/O: callers hand in property records and get
//! plain data back.
//!
//! - [`validation`]: rule engine with best-effort auto-fix.
//! - [`batch`]: chunked processing, grouping and bulk edits.
//! - [`intelligence`]: outliers, market trends, appeal risk, comparables
//!   and the per-property insights report.

pub mod batch;
pub mod error;
pub mod intelligence;
pub mod types;
pub mod validation;
