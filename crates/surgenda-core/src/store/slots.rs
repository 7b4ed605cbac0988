//! Slot store operations.

use chrono::NaiveDate;

use super::{SlotStore, StoreError, StoreResult};
use crate::models::{MonthKey, Slot, SlotId, SlotPatch, SlotStatus};
use crate::remote::RawSlotRecord;

impl SlotStore {
    /// Merge rows fetched from the remote store.
    ///
    /// Unknown ids are inserted; known ids have only their mutable
    /// status/occupancy fields overwritten. Rows marked deleted on the remote
    /// are dropped (and evict a cached copy of the same id). When `for_date`
    /// is given, an empty batch still materializes that bucket as an explicit
    /// empty list.
    ///
    /// Returns the month keys whose data changed, for aggregate recompute.
    pub fn upsert_from_remote(
        &mut self,
        records: &[RawSlotRecord],
        for_date: Option<NaiveDate>,
    ) -> Vec<MonthKey> {
        let mut touched = Vec::new();

        if let Some(date) = for_date {
            self.buckets.entry(date).or_default();
            push_unique(&mut touched, MonthKey::of(date));
        }

        for record in records {
            let Some(incoming) = record.decode() else {
                continue;
            };
            push_unique(&mut touched, incoming.month_key());

            if incoming.status == SlotStatus::Deleted {
                self.remove(&incoming.id);
                continue;
            }

            let bucket = self.buckets.entry(incoming.date).or_default();
            match bucket.iter_mut().find(|slot| slot.id == incoming.id) {
                Some(existing) => existing.absorb_remote(incoming),
                None => bucket.push(incoming),
            }
        }

        touched
    }

    /// Drop every bucket of a month, then upsert the replacement rows. Used
    /// for a full month refresh so stale entries from remotely deleted slots
    /// vanish.
    pub fn replace_month(&mut self, month: MonthKey, records: &[RawSlotRecord]) {
        self.buckets.retain(|date, _| !month.contains(*date));
        self.upsert_from_remote(records, None);
    }

    /// Apply an optimistic patch to the slot with the given id, wherever it
    /// is bucketed. Returns the slot's date so the caller can recompute the
    /// month's aggregate.
    pub fn apply_local_mutation(&mut self, id: &SlotId, patch: &SlotPatch) -> StoreResult<NaiveDate> {
        for (date, bucket) in &mut self.buckets {
            if let Some(slot) = bucket.iter_mut().find(|slot| &slot.id == id) {
                slot.apply(patch);
                return Ok(*date);
            }
        }
        Err(StoreError::UnknownSlot(id.clone()))
    }

    /// Remove one explicitly identified slot. Never touches any other entry.
    pub fn remove(&mut self, id: &SlotId) -> Option<Slot> {
        for bucket in self.buckets.values_mut() {
            if let Some(pos) = bucket.iter().position(|slot| &slot.id == id) {
                return Some(bucket.remove(pos));
            }
        }
        None
    }

    pub fn find_by_id(&self, id: &SlotId) -> Option<&Slot> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter())
            .find(|slot| &slot.id == id)
    }

    /// Slots for a date: `None` when the date was never fetched, `Some(&[])`
    /// when it was fetched and holds nothing.
    pub fn slots_for_date(&self, date: NaiveDate) -> Option<&[Slot]> {
        self.buckets.get(&date).map(Vec::as_slice)
    }

    /// Every cached slot of a month, sorted by date then time.
    pub fn slots_for_month(&self, month: MonthKey) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self
            .buckets
            .iter()
            .filter(|(date, _)| month.contains(**date))
            .flat_map(|(_, bucket)| bucket.iter())
            .collect();
        slots.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
        slots
    }

    /// Whether a date bucket exists (fetched at least once or locally seeded).
    pub fn is_fetched(&self, date: NaiveDate) -> bool {
        self.buckets.contains_key(&date)
    }
}

fn push_unique(months: &mut Vec<MonthKey>, month: MonthKey) {
    if !months.contains(&month) {
        months.push(month);
    }
}
