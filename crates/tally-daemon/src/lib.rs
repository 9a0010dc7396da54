//! tally-daemon library surface.
//!
//! Exposed as a lib so the scenario tests in `tests/` can compose the
//! router in-process (no TCP socket) against an in-memory store.

pub mod api_types;
pub mod routes;
pub mod state;
