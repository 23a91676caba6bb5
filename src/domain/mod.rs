//! Dependency sorting engine
//!
//! Pure in-memory logic without any I/O: items go through the registrar,
//! the rank computer and the result builder, in that order.

mod item;
mod definition;
mod issue;
mod node;
mod registrar;
mod rank;
mod result;
mod sorter;
mod graph;

pub use item::{DependentItem, Discoverer, ItemHandle, ItemRef, OPTIONAL_MARKER};
pub use definition::{DefinitionRef, ItemDefinition};
pub use issue::{Issue, IssueFlags, MissingRequirement};
pub use node::HEAD_NAME_SUFFIX;
pub use result::{CycleRelation, CycleStep, SortResult, SortedNode};
pub use sorter::{sort, DependencySorter, SortOptions, SorterError};
pub use graph::{Constraint, ConstraintEdge, GraphError, OrderGraph};
