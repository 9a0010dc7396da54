//! tally-compare
//!
//! Peer comparison of two independently-submitted case-count tables.
//!
//! Architectural decisions:
//! - Two sheets must agree before either is trusted
//! - Fixed check precedence: key fields, place sets, row counts, then counts
//! - Empty discrepancy list is the only "match" signal
//! - Deterministic, pure logic. No IO. No storage calls.

mod engine;

pub use engine::compare;
