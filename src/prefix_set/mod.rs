//! Mutable prefix accumulation with canonical, queryable results.
//!
//! [`PrefixSetBuilder`] collects additions and removals for one address
//! family and produces a [`PrefixSet`] of sorted, disjoint, non-adjacent
//! ranges. [`Entry`] pairs an IPv4 and an IPv6 builder under one code.

mod builder;
mod entry;

pub use builder::{PrefixSet, PrefixSetBuilder};
pub use entry::{Entry, IpFamilies};
