//! crates/promptsmith_core/src/usage.rs
//!
//! The Usage Meter: counts free-tier generations per local calendar day.
//!
//! There is no background reset. A stored record stamped with an earlier day is
//! simply read as zero, and the next recorded generation restamps it.

use crate::domain::{PlanTier, Remaining, UsageRecord};
use crate::ports::{Clock, KeyValueStore};
use crate::store::USAGE_KEY;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

//=========================================================================================
// Pure Rules
//=========================================================================================

/// Generations still allowed on `today` for the given plan.
pub fn remaining_for(
    plan: PlanTier,
    record: &UsageRecord,
    today: NaiveDate,
    daily_limit: u32,
) -> Remaining {
    match plan {
        PlanTier::Pro => Remaining::Unlimited,
        PlanTier::Free => Remaining::Limited(daily_limit.saturating_sub(record.count_on(today))),
    }
}

/// The record after one more generation on `today`. Pro usage is not metered.
pub fn record_usage_for(plan: PlanTier, record: &UsageRecord, today: NaiveDate) -> UsageRecord {
    match plan {
        PlanTier::Pro => record.clone(),
        PlanTier::Free => UsageRecord {
            date: today,
            count: record.count_on(today).saturating_add(1),
        },
    }
}

/// Reads a persisted usage record, returning `None` for anything that is not
/// a `{date, count}` object with a `YYYY-MM-DD` date and a non-negative count.
pub fn parse_usage_record(raw: &str) -> Option<UsageRecord> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let date = object
        .get("date")?
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())?;

    let count = match object.get("count")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))?,
        _ => return None,
    };

    Some(UsageRecord {
        date,
        count: u32::try_from(count).unwrap_or(u32::MAX),
    })
}

//=========================================================================================
// The Stateful Meter
//=========================================================================================

/// Owns the current usage record and writes it back after every change.
pub struct UsageMeter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    daily_limit: u32,
    record: UsageRecord,
}

impl UsageMeter {
    /// Loads the stored record. Missing or malformed state means no usage yet.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, daily_limit: u32) -> Self {
        let today = clock.today();
        let record = match store.get(USAGE_KEY) {
            Ok(Some(raw)) => parse_usage_record(&raw).unwrap_or_else(|| {
                warn!("Stored usage record is malformed; starting from zero.");
                UsageRecord::empty(today)
            }),
            Ok(None) => UsageRecord::empty(today),
            Err(e) => {
                warn!("Failed to read usage record: {}", e);
                UsageRecord::empty(today)
            }
        };

        Self {
            store,
            clock,
            daily_limit,
            record,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn record(&self) -> &UsageRecord {
        &self.record
    }

    /// Generations already used today.
    pub fn used_today(&self) -> u32 {
        self.record.count_on(self.clock.today())
    }

    pub fn remaining(&self, plan: PlanTier) -> Remaining {
        remaining_for(plan, &self.record, self.clock.today(), self.daily_limit)
    }

    /// Counts one generation. A no-op under the pro plan.
    pub fn record_usage(&mut self, plan: PlanTier) -> &UsageRecord {
        if plan == PlanTier::Pro {
            return &self.record;
        }

        self.record = record_usage_for(plan, &self.record, self.clock.today());
        debug!(
            "Usage recorded: {} on {}",
            self.record.count, self.record.date
        );
        self.persist();
        &self.record
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.record)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(USAGE_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to persist usage record: {}", e);
        }
    }
}
