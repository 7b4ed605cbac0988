//! In-memory slot store and derived aggregates.
//!
//! The store is the client-side mirror of the remote slot rows, bucketed by
//! calendar date. A date bucket can be wholly absent (never fetched) or an
//! explicit empty list (fetched, no slots); the two states stay distinct so
//! the sync layer never mistakes "not fetched" for "load complete".

mod aggregate;
mod slots;

pub use aggregate::AggregateCache;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Slot, SlotId};

/// Slot store errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unknown slot id: {0}")]
    UnknownSlot(SlotId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Date-bucketed slot cache. Memory-only; rebuilt from the remote store on
/// every session start.
#[derive(Debug, Default)]
pub struct SlotStore {
    buckets: BTreeMap<NaiveDate, Vec<Slot>>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}
