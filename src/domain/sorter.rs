//! Sorter entry point
//!
//! Ties registration, rank computation and result building together. A sort
//! is a pure function of its inputs: nothing is kept between runs, so
//! independent sorts can run on separate threads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info_span};

use super::item::{Discoverer, ItemHandle};
use super::rank::{self, Ranking};
use super::registrar;
use super::result::{self, SortResult};

/// Contract violations by the caller. Structural problems in the items are
/// reported through [`SortResult`] instead.
#[derive(Debug, Error, PartialEq)]
pub enum SorterError {
    #[error("Item has an empty full name")]
    EmptyName,

    #[error("Item '{item}' has an empty reference name")]
    EmptyReference { item: String },
}

/// Options of a sort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOptions {
    /// Order items of the same rank by descending name
    pub reverse_names: bool,
}

/// Orders dependent items
#[derive(Debug, Clone, Default)]
pub struct DependencySorter {
    options: SortOptions,
}

impl DependencySorter {
    pub fn new(options: SortOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Sorts `items` and whatever `discoverers` yield
    pub fn sort(
        &self,
        items: &[ItemHandle],
        discoverers: &[&dyn Discoverer],
    ) -> Result<SortResult, SorterError> {
        let span = info_span!("sort", items = items.len(), reverse = self.options.reverse_names);
        let _guard = span.enter();

        let table = registrar::register(items, discoverers)?;
        debug!(nodes = table.len(), "registration complete");

        let ranking = rank::compute(&table);
        if let Ranking::Cycle(ref cycle) = ranking {
            debug!(length = cycle.len(), "sort stopped on a cycle");
        }

        Ok(result::build(table, ranking, self.options.reverse_names))
    }
}

/// Sorts `items` with the given options
pub fn sort(
    items: &[ItemHandle],
    discoverers: &[&dyn Discoverer],
    options: &SortOptions,
) -> Result<SortResult, SorterError> {
    DependencySorter::new(*options).sort(items, discoverers)
}
