//! tally-stats
//!
//! Read-only resolution and aggregation over the canonical dataset.
//!
//! Architectural decisions:
//! - `order_for_place` is the sort key, never the date: it is assigned
//!   monotonically at deployment, so same-date corrections resolve to the
//!   latest revision
//! - Rates with an undefined denominator yield `None`, never a fault
//! - Deterministic, pure logic over slices. No IO, no storage calls.

mod aggregate;
mod resolver;

pub use aggregate::{
    affected_cities, death_rate_percent, nationwide_totals, per_100k, region_totals,
    AggregateTotals,
};
pub use resolver::{most_recent_entries, most_recent_state_entry};
