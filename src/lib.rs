//! depsort - Deterministic dependency ordering for setup pipelines
//!
//! Orders named items so that requirements come first and containers wrap
//! their content (container head, children, container), reports the first
//! cycle when no order exists, and collects structural issues without
//! aborting. The [`domain`] module is the engine; [`storage`] and [`cli`]
//! make it usable from the command line.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    sort, DependencySorter, DependentItem, ItemDefinition, ItemHandle, ItemRef, SortOptions,
    SortResult, SortedNode,
};
