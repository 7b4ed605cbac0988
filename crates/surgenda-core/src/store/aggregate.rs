//! Derived monthly aggregates.

use std::collections::HashMap;

use super::SlotStore;
use crate::models::{ContractClass, MonthKey, MonthlyAggregate, SlotStatus};

/// Cache of derived per-month statistics.
///
/// Consistency contract: every store mutation touching month `M` is followed
/// by `recompute(M)` before KPIs are read, so aggregate reads always reflect
/// the latest completed local mutation.
#[derive(Debug, Default)]
pub struct AggregateCache {
    months: HashMap<MonthKey, MonthlyAggregate>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute one month from the store's current contents. A pure function
    /// of the store; the previously cached value is never consulted, so stale
    /// partial counts cannot leak forward.
    pub fn recompute(&mut self, store: &SlotStore, month: MonthKey) -> &MonthlyAggregate {
        let aggregate = compute(store, month);
        self.months.insert(month, aggregate);
        &self.months[&month]
    }

    /// Cached aggregate, computing it on first access. Months with no data
    /// yield an explicit zero-valued aggregate, never a missing entry.
    pub fn get(&mut self, store: &SlotStore, month: MonthKey) -> &MonthlyAggregate {
        if !self.months.contains_key(&month) {
            return self.recompute(store, month);
        }
        &self.months[&month]
    }
}

/// Count one month of slot data.
///
/// Regulated/internal units are counted per procedure entry under local
/// contracts (falling back to the slot-level legacy flag when a slot carries
/// no entry list); municipal units are one per entry, or one per slot without
/// an entry list. Slots without a recognizable contract count only toward
/// occupancy.
pub fn compute(store: &SlotStore, month: MonthKey) -> MonthlyAggregate {
    let mut aggregate = MonthlyAggregate::default();

    for slot in store.slots_for_month(month) {
        aggregate.total_slots += 1;

        if slot.status != SlotStatus::Occupied {
            continue;
        }
        aggregate.occupied_slots += 1;

        let Some(occupancy) = slot.occupancy.as_ref() else {
            continue;
        };
        let Some(contract) = occupancy.contract else {
            continue;
        };

        match contract {
            ContractClass::Municipal(municipal) => {
                let units = occupancy.procedures.len().max(1) as u32;
                aggregate.municipal.add(municipal, units);
            }
            ContractClass::Local(local) => {
                if occupancy.procedures.is_empty() {
                    // Legacy slot: one unit from the slot-level flag
                    if occupancy.regulated {
                        aggregate.regulated.add(local);
                    } else {
                        aggregate.internal.add(local);
                    }
                    continue;
                }
                for entry in &occupancy.procedures {
                    if entry.regulated {
                        aggregate.regulated.add(local);
                    } else {
                        aggregate.internal.add(local);
                        if let Some(internal_type) = entry.internal_type {
                            aggregate.internal_types.add(internal_type);
                        }
                    }
                }
            }
        }
    }

    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        InternalType, LocalContract, MunicipalContract, Occupancy, ProcedureEntry, Slot, SlotId,
        SlotPatch,
    };
    use crate::remote::RawSlotRecord;

    fn month() -> MonthKey {
        MonthKey::new(2026, 3).unwrap()
    }

    fn seeded_store(slots: Vec<Slot>) -> SlotStore {
        let mut store = SlotStore::new();
        let rows: Vec<RawSlotRecord> = slots.iter().map(RawSlotRecord::from_slot).collect();
        store.upsert_from_remote(&rows, None);
        store
    }

    fn occupied_slot(id: &str, contract: ContractClass, procedures: Vec<ProcedureEntry>) -> Slot {
        let mut slot = Slot::free(
            SlotId::new(id),
            crate::models::parse_date_key("2026-03-05").unwrap(),
            "08:00",
            "1",
        );
        slot.apply(&SlotPatch::Occupy(Occupancy {
            patient: "Maria".into(),
            record: "1".into(),
            contract: Some(contract),
            regulated: procedures.iter().any(|p| p.regulated),
            procedures,
            ..Occupancy::default()
        }));
        slot
    }

    #[test]
    fn test_per_procedure_counting() {
        let store = seeded_store(vec![occupied_slot(
            "1",
            ContractClass::Local(LocalContract::Estado),
            vec![
                ProcedureEntry::regulated("a"),
                ProcedureEntry::internal("b", InternalType::Emergency),
                ProcedureEntry::internal("c", InternalType::ScheduledProject),
            ],
        )]);

        let aggregate = compute(&store, month());
        assert_eq!(aggregate.regulated.total, 1);
        assert_eq!(aggregate.internal.total, 2);
        assert_eq!(aggregate.internal.estado, 2);
        assert_eq!(aggregate.internal_types.emergency, 1);
        assert_eq!(aggregate.internal_types.scheduled_project, 1);
        assert_eq!(aggregate.occupied_slots, 1);
    }

    #[test]
    fn test_municipal_per_procedure_or_one() {
        let with_list = occupied_slot(
            "1",
            ContractClass::Municipal(MunicipalContract::Recife),
            vec![
                ProcedureEntry::regulated("a"),
                ProcedureEntry::regulated("b"),
            ],
        );
        let without_list = occupied_slot(
            "2",
            ContractClass::Municipal(MunicipalContract::Jaboatao),
            Vec::new(),
        );

        let store = seeded_store(vec![with_list, without_list]);
        let aggregate = compute(&store, month());
        assert_eq!(aggregate.municipal.recife, 2);
        assert_eq!(aggregate.municipal.jaboatao, 1);
        assert_eq!(aggregate.municipal.total, 3);
        // Municipal units never enter the governed buckets
        assert_eq!(aggregate.governed_total(), 0);
    }

    #[test]
    fn test_legacy_flag_fallback() {
        let mut slot = occupied_slot(
            "1",
            ContractClass::Local(LocalContract::Serra),
            Vec::new(),
        );
        if let Some(occ) = slot.occupancy.as_mut() {
            occ.regulated = true;
        }

        let store = seeded_store(vec![slot]);
        let aggregate = compute(&store, month());
        assert_eq!(aggregate.regulated.serra, 1);
        assert_eq!(aggregate.internal.total, 0);
    }

    #[test]
    fn test_recompute_idempotent() {
        let store = seeded_store(vec![occupied_slot(
            "1",
            ContractClass::Local(LocalContract::Estado),
            vec![ProcedureEntry::regulated("a")],
        )]);

        let mut cache = AggregateCache::new();
        let first = *cache.recompute(&store, month());
        let second = *cache.recompute(&store, month());
        assert_eq!(first, second);
    }

    #[test]
    fn test_recompute_never_reads_previous_value() {
        let mut store = seeded_store(vec![occupied_slot(
            "1",
            ContractClass::Local(LocalContract::Estado),
            vec![ProcedureEntry::regulated("a")],
        )]);

        let mut cache = AggregateCache::new();
        cache.recompute(&store, month());

        store.remove(&SlotId::new("1"));
        let aggregate = *cache.recompute(&store, month());
        assert_eq!(aggregate, MonthlyAggregate::default());
    }

    #[test]
    fn test_get_returns_zero_for_unknown_month() {
        let store = SlotStore::new();
        let mut cache = AggregateCache::new();
        let aggregate = cache.get(&store, MonthKey::new(2030, 1).unwrap());
        assert_eq!(*aggregate, MonthlyAggregate::default());
    }

    #[test]
    fn test_unknown_contract_counts_occupancy_only() {
        let mut slot = occupied_slot(
            "1",
            ContractClass::Local(LocalContract::Estado),
            vec![ProcedureEntry::regulated("a")],
        );
        if let Some(occ) = slot.occupancy.as_mut() {
            occ.contract = None;
        }

        let store = seeded_store(vec![slot]);
        let aggregate = compute(&store, month());
        assert_eq!(aggregate.occupied_slots, 1);
        assert_eq!(aggregate.governed_total(), 0);
        assert_eq!(aggregate.municipal.total, 0);
    }
}
