//! Monthly aggregate (dashboard) models.

use serde::{Deserialize, Serialize};

use super::contract::{LocalContract, MunicipalContract};
use super::procedure::InternalType;

/// Counts for one quota bucket, broken down by local contract class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBucket {
    pub total: u32,
    pub estado: u32,
    pub serra: u32,
    pub salgueiro: u32,
}

impl LocalBucket {
    pub(crate) fn add(&mut self, contract: LocalContract) {
        self.total += 1;
        match contract {
            LocalContract::Estado => self.estado += 1,
            LocalContract::Serra => self.serra += 1,
            LocalContract::Salgueiro => self.salgueiro += 1,
        }
    }
}

/// Internal-type sub-breakdown; legacy entries without a tag are counted in
/// the bucket total only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalTypes {
    pub emergency: u32,
    pub scheduled_project: u32,
}

impl InternalTypes {
    pub(crate) fn add(&mut self, internal_type: InternalType) {
        match internal_type {
            InternalType::Emergency => self.emergency += 1,
            InternalType::ScheduledProject => self.scheduled_project += 1,
        }
    }
}

/// Municipal counts per municipal contract class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalBucket {
    pub total: u32,
    pub recife: u32,
    pub jaboatao: u32,
}

impl MunicipalBucket {
    pub(crate) fn add(&mut self, contract: MunicipalContract, units: u32) {
        self.total += units;
        match contract {
            MunicipalContract::Recife => self.recife += units,
            MunicipalContract::Jaboatao => self.jaboatao += units,
        }
    }
}

/// Derived statistics for one month of slot data.
///
/// Regulated/internal counts are per procedure entry, not per slot; municipal
/// counts are one unit per entry, or one unit when no entry list exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// Physical slot count over every cached date of the month
    pub total_slots: u32,
    /// Physically occupied slots
    pub occupied_slots: u32,
    pub regulated: LocalBucket,
    pub internal: LocalBucket,
    pub internal_types: InternalTypes,
    pub municipal: MunicipalBucket,
}

impl MonthlyAggregate {
    pub fn free_slots(&self) -> u32 {
        self.total_slots - self.occupied_slots
    }

    /// Governed universe: regulated + internal procedure entries. Municipal
    /// entries are exempt from the quota split.
    pub fn governed_total(&self) -> u32 {
        self.regulated.total + self.internal.total
    }

    /// Regulated share of the governed universe, in percent.
    pub fn pct_regulated(&self) -> f64 {
        percentage(self.regulated.total, self.governed_total())
    }

    /// Internal share of the governed universe, in percent.
    pub fn pct_internal(&self) -> f64 {
        percentage(self.internal.total, self.governed_total())
    }

    /// Physical occupancy rate, in percent.
    pub fn pct_occupied(&self) -> f64 {
        percentage(self.occupied_slots, self.total_slots)
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_aggregate_percentages() {
        let aggregate = MonthlyAggregate::default();
        assert_eq!(aggregate.pct_regulated(), 0.0);
        assert_eq!(aggregate.pct_internal(), 0.0);
        assert_eq!(aggregate.pct_occupied(), 0.0);
        assert_eq!(aggregate.free_slots(), 0);
    }

    #[test]
    fn test_occupancy_rate() {
        let aggregate = MonthlyAggregate {
            total_slots: 8,
            occupied_slots: 6,
            ..MonthlyAggregate::default()
        };
        assert_eq!(aggregate.free_slots(), 2);
        assert!((aggregate.pct_occupied() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bucket_breakdown() {
        let mut bucket = LocalBucket::default();
        bucket.add(LocalContract::Estado);
        bucket.add(LocalContract::Estado);
        bucket.add(LocalContract::Serra);
        assert_eq!(bucket.total, 3);
        assert_eq!(bucket.estado, 2);
        assert_eq!(bucket.serra, 1);
        assert_eq!(bucket.salgueiro, 0);
    }

    #[test]
    fn test_governed_percentages() {
        let aggregate = MonthlyAggregate {
            regulated: LocalBucket {
                total: 6,
                estado: 6,
                ..LocalBucket::default()
            },
            internal: LocalBucket {
                total: 4,
                serra: 4,
                ..LocalBucket::default()
            },
            municipal: MunicipalBucket {
                total: 10,
                recife: 10,
                jaboatao: 0,
            },
            ..MonthlyAggregate::default()
        };
        // Municipal units never enter the governed denominator
        assert_eq!(aggregate.governed_total(), 10);
        assert!((aggregate.pct_regulated() - 60.0).abs() < f64::EPSILON);
        assert!((aggregate.pct_internal() - 40.0).abs() < f64::EPSILON);
    }
}
