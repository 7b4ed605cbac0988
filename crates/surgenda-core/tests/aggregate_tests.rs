//! Aggregate counting properties.
//!
//! Golden cases pin the per-procedure counting rules; the proptest block
//! checks idempotence, order independence, and breakdown consistency over
//! arbitrary slot mixes.

use proptest::prelude::*;
use surgenda_core::{
    AggregateCache, MonthKey, MonthlyAggregate, ProcedureEntry, RawSlotRecord, SlotStore,
};

fn month() -> MonthKey {
    MonthKey::new(2026, 3).unwrap()
}

fn build_store(rows: &[RawSlotRecord]) -> SlotStore {
    let mut store = SlotStore::new();
    store.upsert_from_remote(rows, None);
    store
}

fn aggregate_of(rows: &[RawSlotRecord]) -> MonthlyAggregate {
    let store = build_store(rows);
    let mut cache = AggregateCache::new();
    *cache.recompute(&store, month())
}

fn row(id: &str, status: &str, contract: &str, procedure: &str, regulated: bool) -> RawSlotRecord {
    RawSlotRecord {
        id: id.into(),
        date: "2026-03-05".into(),
        time: "08:00".into(),
        status: status.into(),
        contract: contract.into(),
        procedure: procedure.into(),
        regulated,
        patient: if status == "OCUPADO" { "P".into() } else { String::new() },
        ..RawSlotRecord::default()
    }
}

/// Golden counting case.
struct GoldenCase {
    id: &'static str,
    rows: Vec<RawSlotRecord>,
    expected_regulated: u32,
    expected_internal: u32,
    expected_municipal: u32,
    expected_occupied: u32,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "one-regulated-two-internal",
            rows: vec![row(
                "1",
                "OCUPADO",
                "ESTADO",
                r#"[{"name":"a","regulated":true},{"name":"b","regulated":false},{"name":"c","regulated":false}]"#,
                true,
            )],
            expected_regulated: 1,
            expected_internal: 2,
            expected_municipal: 0,
            expected_occupied: 1,
        },
        GoldenCase {
            id: "municipal-counts-per-procedure",
            rows: vec![row(
                "1",
                "OCUPADO",
                "RECIFE",
                r#"[{"name":"a","regulated":false},{"name":"b","regulated":false}]"#,
                false,
            )],
            expected_regulated: 0,
            expected_internal: 0,
            expected_municipal: 2,
            expected_occupied: 1,
        },
        GoldenCase {
            id: "municipal-without-list-counts-one",
            rows: vec![row("1", "OCUPADO", "JABOATÃO", "", false)],
            expected_regulated: 0,
            expected_internal: 0,
            expected_municipal: 1,
            expected_occupied: 1,
        },
        GoldenCase {
            id: "legacy-flat-string-uses-slot-flag",
            rows: vec![
                row("1", "OCUPADO", "SERRA", "Trabeculectomia", true),
                row("2", "OCUPADO", "SERRA", "Panfoto", false),
            ],
            expected_regulated: 1,
            expected_internal: 1,
            expected_municipal: 0,
            expected_occupied: 2,
        },
        GoldenCase {
            id: "free-slots-count-capacity-only",
            rows: vec![
                row("1", "LIVRE", "", "", false),
                row("2", "LIVRE", "", "", false),
            ],
            expected_regulated: 0,
            expected_internal: 0,
            expected_municipal: 0,
            expected_occupied: 0,
        },
        GoldenCase {
            id: "contractless-occupied-counts-occupancy-only",
            rows: vec![row("1", "OCUPADO", "", "Faco", true)],
            expected_regulated: 0,
            expected_internal: 0,
            expected_municipal: 0,
            expected_occupied: 1,
        },
    ]
}

#[test]
fn test_golden_counting_cases() {
    for case in golden_cases() {
        let aggregate = aggregate_of(&case.rows);
        assert_eq!(
            aggregate.regulated.total, case.expected_regulated,
            "case {}",
            case.id
        );
        assert_eq!(
            aggregate.internal.total, case.expected_internal,
            "case {}",
            case.id
        );
        assert_eq!(
            aggregate.municipal.total, case.expected_municipal,
            "case {}",
            case.id
        );
        assert_eq!(
            aggregate.occupied_slots, case.expected_occupied,
            "case {}",
            case.id
        );
        assert_eq!(aggregate.total_slots, case.rows.len() as u32, "case {}", case.id);
    }
}

#[test]
fn test_other_months_do_not_bleed_in() {
    let mut rows = vec![row("1", "OCUPADO", "ESTADO", "Faco", true)];
    let mut other = row("2", "OCUPADO", "ESTADO", "Faco", true);
    other.date = "2026-04-05".into();
    rows.push(other);

    let aggregate = aggregate_of(&rows);
    assert_eq!(aggregate.total_slots, 1);
    assert_eq!(aggregate.regulated.total, 1);
}

// =========================================================================
// Property tests
// =========================================================================

#[derive(Debug, Clone)]
struct SlotSeed {
    day: u32,
    occupied: bool,
    contract: usize,
    procedures: Vec<(bool, bool)>, // (regulated, tagged)
    legacy_regulated: bool,
}

const CONTRACTS: [&str; 6] = ["", "ESTADO", "SERRA", "SALGUEIRO", "RECIFE", "JABOATÃO"];

fn arb_seed() -> impl Strategy<Value = SlotSeed> {
    (
        1..=28u32,
        any::<bool>(),
        0..CONTRACTS.len(),
        proptest::collection::vec((any::<bool>(), any::<bool>()), 0..4),
        any::<bool>(),
    )
        .prop_map(|(day, occupied, contract, procedures, legacy_regulated)| SlotSeed {
            day,
            occupied,
            contract,
            procedures,
            legacy_regulated,
        })
}

fn rows_from_seeds(seeds: &[SlotSeed]) -> Vec<RawSlotRecord> {
    seeds
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            let entries: Vec<ProcedureEntry> = seed
                .procedures
                .iter()
                .enumerate()
                .map(|(i, (regulated, tagged))| ProcedureEntry {
                    name: format!("proc-{}", i),
                    regulated: *regulated,
                    internal_type: (!regulated && *tagged)
                        .then_some(surgenda_core::InternalType::Emergency),
                })
                .collect();
            let procedure = if entries.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&entries).unwrap()
            };

            let mut record = row(
                &format!("id-{}", index),
                if seed.occupied { "OCUPADO" } else { "LIVRE" },
                CONTRACTS[seed.contract],
                &procedure,
                seed.legacy_regulated,
            );
            record.date = format!("2026-03-{:02}", seed.day);
            record
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_recompute_is_idempotent(seeds in proptest::collection::vec(arb_seed(), 0..40)) {
        let rows = rows_from_seeds(&seeds);
        let store = build_store(&rows);
        let mut cache = AggregateCache::new();

        let first = *cache.recompute(&store, month());
        let second = *cache.recompute(&store, month());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_counting_is_order_independent(seeds in proptest::collection::vec(arb_seed(), 0..40)) {
        let rows = rows_from_seeds(&seeds);
        let mut reversed = rows.clone();
        reversed.reverse();

        prop_assert_eq!(aggregate_of(&rows), aggregate_of(&reversed));
    }

    #[test]
    fn prop_breakdowns_are_consistent(seeds in proptest::collection::vec(arb_seed(), 0..40)) {
        let aggregate = aggregate_of(&rows_from_seeds(&seeds));

        prop_assert!(aggregate.occupied_slots <= aggregate.total_slots);
        prop_assert_eq!(
            aggregate.regulated.estado + aggregate.regulated.serra + aggregate.regulated.salgueiro,
            aggregate.regulated.total
        );
        prop_assert_eq!(
            aggregate.internal.estado + aggregate.internal.serra + aggregate.internal.salgueiro,
            aggregate.internal.total
        );
        prop_assert_eq!(
            aggregate.municipal.recife + aggregate.municipal.jaboatao,
            aggregate.municipal.total
        );
        // Untagged legacy entries only ever shrink the typed sub-breakdown
        prop_assert!(
            aggregate.internal_types.emergency + aggregate.internal_types.scheduled_project
                <= aggregate.internal.total
        );
    }
}
