//! Chunked bulk slot creation and deletion.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;
use tracing::warn;

use crate::models::{working_days, MonthKey, SessionError, Slot, SlotId};
use crate::remote::{RawSlotRecord, RemoteStore, WriteAction};
use crate::AgendaContext;

/// Rows per `create_bulk` call; chunks are awaited sequentially to respect
/// the remote store's throughput limits.
const CREATE_CHUNK: usize = 10;

/// Bulk operation errors raised before anything is submitted.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Time window must end after it starts")]
    EmptyWindow,

    #[error("Slot quantity must be at least 1")]
    ZeroQuantity,

    #[error("Date range contains no working days")]
    NoWorkingDays,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Accounting for a chunked bulk operation.
///
/// Earlier successful chunks are never retracted, so after a failure the
/// remote store may briefly hold more rows than the local cache until the
/// next full sync reconciles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub confirmed: usize,
    /// Error text from the first failing call, if any.
    pub failure: Option<String>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.confirmed == self.requested
    }
}

/// Parameters for bulk slot generation over a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkPlan {
    pub start_date: NaiveDate,
    /// Inclusive; equal to `start_date` for a single day
    pub end_date: NaiveDate,
    pub room: String,
    pub location: String,
    pub doctor: String,
    /// Specialty group stamped on every generated slot
    pub specialty: String,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    /// Slots per included day
    pub quantity: u32,
}

impl BulkPlan {
    /// Evenly spaced start times, floor-rounded to the minute.
    fn times(&self) -> Result<Vec<String>, BatchError> {
        if self.quantity == 0 {
            return Err(BatchError::ZeroQuantity);
        }
        let start = minutes(self.window_start);
        let end = minutes(self.window_end);
        if end <= start {
            return Err(BatchError::EmptyWindow);
        }

        let span = end - start;
        Ok((0..self.quantity)
            .map(|i| {
                let m = start + (i * span) / self.quantity;
                format!("{:02}:{:02}", m / 60, m % 60)
            })
            .collect())
    }

    /// Generate one free slot per sub-interval per working day, with locally
    /// minted identifiers. Weekend dates in the range are skipped.
    pub fn generate(&self) -> Result<Vec<Slot>, BatchError> {
        let days = working_days(self.start_date, self.end_date);
        if days.is_empty() {
            return Err(BatchError::NoWorkingDays);
        }
        let times = self.times()?;

        let mut slots = Vec::with_capacity(days.len() * times.len());
        for day in days {
            for time in &times {
                let mut slot = Slot::free(SlotId::mint(), day, time.clone(), self.room.clone());
                slot.location = self.location.clone();
                slot.doctor = self.doctor.clone();
                slot.specialty = self.specialty.clone();
                slots.push(slot);
            }
        }
        Ok(slots)
    }
}

fn minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

impl<R: RemoteStore> AgendaContext<R> {
    /// Generate and submit slots in chunks, each chunk awaited before the
    /// next is sent. The first failing chunk stops the operation; confirmed
    /// rows are mirrored into the local cache and the planned months are
    /// invalidated so the next sync reconciles the remainder.
    pub async fn bulk_create(&mut self, plan: &BulkPlan) -> Result<BatchReport, BatchError> {
        let token = self.session.token()?.clone();
        let by = self
            .session
            .user()
            .map(|user| user.name.clone())
            .unwrap_or_default();

        let slots = plan.generate()?;
        let rows: Vec<RawSlotRecord> = slots
            .iter()
            .map(|slot| {
                let mut row = RawSlotRecord::from_slot(slot);
                row.created_by = by.clone();
                row
            })
            .collect();
        let requested = rows.len();

        let mut confirmed = 0;
        let mut failure = None;
        for chunk in rows.chunks(CREATE_CHUNK) {
            let action = WriteAction::CreateBulk {
                data: chunk.to_vec(),
            };
            match self.remote.write(&action, &token).await {
                Ok(_) => confirmed += chunk.len(),
                Err(err) => {
                    warn!(error = %err, confirmed, requested, "bulk create chunk failed");
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        // Mirror confirmed rows locally; one recompute per touched month
        let touched = self.store.upsert_from_remote(&rows[..confirmed], None);
        for month in &touched {
            self.aggregates.recompute(&self.store, *month);
        }
        if failure.is_some() {
            let mut planned: Vec<MonthKey> = Vec::new();
            for slot in &slots {
                let month = slot.month_key();
                if !planned.contains(&month) {
                    planned.push(month);
                }
            }
            for month in planned {
                self.sync.invalidate(month);
            }
        }

        Ok(BatchReport {
            requested,
            confirmed,
            failure,
        })
    }

    /// Delete slots one by one, counting successes; a failed id does not stop
    /// the remaining deletions. Confirmed ids leave the local cache and each
    /// affected month's aggregate is recomputed once at the end.
    pub async fn bulk_delete(&mut self, ids: &[SlotId]) -> Result<BatchReport, BatchError> {
        let token = self.session.require_manager()?.clone();

        let mut confirmed = 0;
        let mut failure = None;
        let mut touched: Vec<MonthKey> = Vec::new();
        for id in ids {
            let action = WriteAction::Delete {
                id: id.as_str().to_string(),
            };
            match self.remote.write(&action, &token).await {
                Ok(_) => {
                    confirmed += 1;
                    if let Some(slot) = self.store.remove(id) {
                        let month = slot.month_key();
                        if !touched.contains(&month) {
                            touched.push(month);
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, id = %id, "bulk delete failed for id");
                    if failure.is_none() {
                        failure = Some(err.to_string());
                    }
                }
            }
        }

        for month in touched {
            self.aggregates.recompute(&self.store, month);
        }

        Ok(BatchReport {
            requested: ids.len(),
            confirmed,
            failure,
        })
    }
}
