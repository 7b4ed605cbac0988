//! Sync controller: month freshness and remote fetch orchestration.
//!
//! Each month of slot data moves through `Unloaded → Loading → Loaded`, with
//! `Stale` forcing the next fetch onto the network. Foreground fetches may
//! block the UI and surface errors; background fetches log and keep whatever
//! was already rendered.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{MonthKey, SessionToken, Slot};
use crate::remote::{RemoteError, RemoteStore};
use crate::store::{AggregateCache, SlotStore};

/// Freshness state for one month of slot data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthState {
    #[default]
    Unloaded,
    Loading,
    /// A full month fetch completed and nothing invalidated it since.
    Loaded,
    /// Invalidated; the next fetch must hit the network.
    Stale,
}

/// Whether a fetch is user-visible or silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// May show a blocking wait indicator; errors surface to the caller.
    Foreground,
    /// Errors are logged and swallowed; rendered data is left alone.
    Background,
}

/// Outcome of a month fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthFetch {
    /// False when the month was already fresh and no network call happened.
    pub refreshed: bool,
    /// True when the selected date's visible slot list changed, so the UI
    /// should re-render it. Unchanged data skips the re-render to avoid
    /// flicker.
    pub selected_day_changed: bool,
}

impl MonthFetch {
    const SKIPPED: Self = Self {
        refreshed: false,
        selected_day_changed: false,
    };
}

/// Orchestrates remote fetches into the slot store and aggregate cache.
#[derive(Debug, Default)]
pub struct SyncController {
    months: HashMap<MonthKey, MonthState>,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, month: MonthKey) -> MonthState {
        self.months.get(&month).copied().unwrap_or_default()
    }

    /// Mark a month stale so the next fetch performs a real round trip even
    /// if the in-memory flag would otherwise short-circuit it.
    pub fn invalidate(&mut self, month: MonthKey) {
        self.months.insert(month, MonthState::Stale);
    }

    /// Fetch one day and merge it into the store. Returns whether the day's
    /// slot list changed. Background failures are logged, not surfaced.
    pub async fn fetch_day<R: RemoteStore>(
        &mut self,
        remote: &R,
        token: &SessionToken,
        store: &mut SlotStore,
        aggregates: &mut AggregateCache,
        date: NaiveDate,
        mode: FetchMode,
    ) -> Result<bool, RemoteError> {
        let records = match remote.read_day(date, token).await {
            Ok(records) => records,
            Err(err) if mode == FetchMode::Background => {
                warn!(date = %date, error = %err, "background day fetch failed");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let before = snapshot(store, date);
        let touched = store.upsert_from_remote(&records, Some(date));
        for month in touched {
            aggregates.recompute(store, month);
        }
        Ok(before.as_deref() != store.slots_for_date(date))
    }

    /// Fetch a whole month, replacing its cached data. A no-op when the month
    /// is already fresh. On failure the month drops back to `Stale` and the
    /// error is returned once to the caller.
    pub async fn fetch_month<R: RemoteStore>(
        &mut self,
        remote: &R,
        token: &SessionToken,
        store: &mut SlotStore,
        aggregates: &mut AggregateCache,
        month: MonthKey,
        selected: NaiveDate,
    ) -> Result<MonthFetch, RemoteError> {
        if self.state(month) == MonthState::Loaded {
            debug!(%month, "month already fresh, skipping fetch");
            return Ok(MonthFetch::SKIPPED);
        }

        self.months.insert(month, MonthState::Loading);
        let before = snapshot(store, selected);

        let records = match remote.read_month(month, token).await {
            Ok(records) => records,
            Err(err) => {
                self.months.insert(month, MonthState::Stale);
                return Err(err);
            }
        };

        store.replace_month(month, &records);
        aggregates.recompute(store, month);
        self.months.insert(month, MonthState::Loaded);

        let selected_day_changed =
            month.contains(selected) && before.as_deref() != store.slots_for_date(selected);

        Ok(MonthFetch {
            refreshed: true,
            selected_day_changed,
        })
    }
}

fn snapshot(store: &SlotStore, date: NaiveDate) -> Option<Vec<Slot>> {
    store.slots_for_date(date).map(<[Slot]>::to_vec)
}
