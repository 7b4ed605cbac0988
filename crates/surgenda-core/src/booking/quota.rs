//! Quota gauge for the regulated/internal split.

use crate::models::{ContractClass, MonthKey, MonthlyAggregate, ProcedureEntry};
use crate::remote::RemoteStore;
use crate::AgendaContext;

/// Thresholds for the governed procedure mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaPolicy {
    /// Regulated entries must stay at or above this share, in percent.
    pub regulated_floor: f64,
    /// Internal entries must stay at or below this share, in percent.
    pub internal_ceiling: f64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            regulated_floor: 60.0,
            internal_ceiling: 40.0,
        }
    }
}

/// Warning raised when an in-flight booking would breach the quota mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuotaWarning {
    /// Internal share would exceed the ceiling.
    InternalCeiling { projected_pct: f64 },
    /// Regulated share would fall under the floor.
    RegulatedFloor { projected_pct: f64 },
}

/// Project a month's governed mix as if the in-flight entries were booked.
///
/// Municipal bookings are exempt, months with no cached slots stay silent,
/// and only bookings that add internal entries can warn. Percentages run over
/// the governed universe only (regulated + internal entries), including the
/// in-flight booking's own entries.
pub fn evaluate(
    aggregate: &MonthlyAggregate,
    contract: Option<ContractClass>,
    entries: &[ProcedureEntry],
    policy: &QuotaPolicy,
) -> Option<QuotaWarning> {
    let contract = contract?;
    if contract.is_municipal() || aggregate.total_slots == 0 {
        return None;
    }

    let named = || entries.iter().filter(|entry| !entry.name.trim().is_empty());
    let mut new_regulated = named().filter(|entry| entry.regulated).count() as u32;
    let new_internal = named().filter(|entry| !entry.regulated).count() as u32;
    if new_regulated == 0 && new_internal == 0 {
        // An empty surface projects as a single regulated entry
        new_regulated = 1;
    }

    let regulated = aggregate.regulated.total + new_regulated;
    let internal = aggregate.internal.total + new_internal;
    let universe = f64::from((regulated + internal).max(1));

    let pct_regulated = f64::from(regulated) / universe * 100.0;
    let pct_internal = f64::from(internal) / universe * 100.0;

    if new_internal > 0 && pct_internal > policy.internal_ceiling {
        Some(QuotaWarning::InternalCeiling {
            projected_pct: pct_internal,
        })
    } else if new_internal > 0 && pct_regulated < policy.regulated_floor {
        Some(QuotaWarning::RegulatedFloor {
            projected_pct: pct_regulated,
        })
    } else {
        None
    }
}

impl<R: RemoteStore> AgendaContext<R> {
    /// Project the selected month's quota mix for an in-flight booking form.
    pub fn quota_warning(&mut self, form: &super::BookingForm) -> Option<QuotaWarning> {
        let month = MonthKey::of(self.selected_date);
        let aggregate = *self.aggregates.get(&self.store, month);
        evaluate(
            &aggregate,
            form.contract,
            &form.procedures,
            &QuotaPolicy::default(),
        )
    }
}
