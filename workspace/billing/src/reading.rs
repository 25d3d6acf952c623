//! Reading intake and data repair.
//!
//! A meter has at most one reading per period. The unique index enforces it
//! at the database level; [`create`] also pre-checks so callers get a typed
//! error instead of a driver error. [`repair_duplicates`] cleans up rows that
//! predate the index.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QuerySelect, Set, SqlErr};
use tracing::{info, instrument, warn};

use model::entities::prelude::{Invoice, Meter, Reading};
use model::entities::{invoice, reading};

use crate::error::{BillingError, Result};
use crate::period::BillingPeriod;

#[derive(Debug, Clone)]
pub struct NewReading {
    pub meter_id: i32,
    pub value_m3: i32,
    pub reading_date: NaiveDate,
    /// Empty when the reading was synthesized rather than photographed.
    pub photo_path: String,
    pub photo_name: Option<String>,
    pub year: i32,
    pub month: u32,
}

/// One reading competing to survive a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub reading_id: i32,
    pub has_invoice: bool,
    pub has_photo: bool,
}

/// Result of a [`repair_duplicates`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Duplicate (meter, period) groups found.
    pub groups: usize,
    /// Losing rows deleted.
    pub deleted: usize,
    /// Losing rows kept because an invoice references them.
    pub kept_invoiced: usize,
}

pub async fn create<C>(db: &C, new: NewReading) -> Result<reading::Model>
where
    C: ConnectionTrait,
{
    let period = BillingPeriod::new(new.year, new.month)?;
    if new.value_m3 < 0 {
        return Err(BillingError::InvalidAmount(format!(
            "reading value must be non-negative, got {}",
            new.value_m3
        )));
    }
    if Meter::find_by_id(new.meter_id).one(db).await?.is_none() {
        return Err(BillingError::NotFound(format!("meter {}", new.meter_id)));
    }

    let duplicate = BillingError::DuplicateReading {
        meter_id: new.meter_id,
        year: period.year,
        month: period.month,
    };
    if find_for_period(db, new.meter_id, period).await?.is_some() {
        return Err(duplicate);
    }

    let row = reading::ActiveModel {
        meter_id: Set(new.meter_id),
        value_m3: Set(new.value_m3),
        reading_date: Set(new.reading_date),
        photo_path: Set(new.photo_path),
        photo_name: Set(new.photo_name),
        year: Set(period.year),
        month: Set(period.month as i32),
        ..Default::default()
    };
    match row.insert(db).await {
        Ok(model) => Ok(model),
        // Concurrent insert slipped past the pre-check; the index caught it.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(duplicate)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn find_for_period<C>(
    db: &C,
    meter_id: i32,
    period: BillingPeriod,
) -> Result<Option<reading::Model>>
where
    C: ConnectionTrait,
{
    Ok(Reading::find()
        .filter(reading::Column::MeterId.eq(meter_id))
        .filter(reading::Column::Year.eq(period.year))
        .filter(reading::Column::Month.eq(period.month as i32))
        .one(db)
        .await?)
}

/// Changes the captured value of a reading that has not been billed yet.
#[instrument(skip(db))]
pub async fn update_value<C>(db: &C, reading_id: i32, value_m3: i32) -> Result<reading::Model>
where
    C: ConnectionTrait,
{
    if value_m3 < 0 {
        return Err(BillingError::InvalidAmount(format!(
            "reading value must be non-negative, got {}",
            value_m3
        )));
    }
    let row = Reading::find_by_id(reading_id)
        .one(db)
        .await?
        .ok_or_else(|| BillingError::NotFound(format!("reading {}", reading_id)))?;

    if let Some(inv) = Invoice::find()
        .filter(invoice::Column::ReadingId.eq(reading_id))
        .one(db)
        .await?
    {
        return Err(BillingError::ReadingLocked {
            reading_id,
            invoice_id: inv.id,
        });
    }

    let mut active: reading::ActiveModel = row.into();
    active.value_m3 = Set(value_m3);
    Ok(active.update(db).await?)
}

/// Picks the reading that should survive a duplicate group: invoice-bearing
/// rows win, then photo-bearing ones, then the newest row.
pub fn rank_duplicates(candidates: &[DuplicateCandidate]) -> Option<DuplicateCandidate> {
    candidates
        .iter()
        .max_by_key(|c| (c.has_invoice, c.has_photo, c.reading_id))
        .copied()
}

/// One-shot cleanup of readings that predate the (meter, year, month) unique
/// index. Keeps the best row per group and deletes the rest, except rows an
/// invoice still references.
#[instrument(skip(db))]
pub async fn repair_duplicates<C>(db: &C) -> Result<RepairSummary>
where
    C: ConnectionTrait,
{
    let all = Reading::find().all(db).await?;
    let invoiced: Vec<i32> = Invoice::find()
        .select_only()
        .column(invoice::Column::ReadingId)
        .into_tuple()
        .all(db)
        .await?;

    let mut groups: HashMap<(i32, i32, i32), Vec<&reading::Model>> = HashMap::new();
    for row in &all {
        groups
            .entry((row.meter_id, row.year, row.month))
            .or_default()
            .push(row);
    }

    let mut summary = RepairSummary::default();
    for ((meter_id, year, month), rows) in groups {
        if rows.len() < 2 {
            continue;
        }
        summary.groups += 1;

        let candidates: Vec<DuplicateCandidate> = rows
            .iter()
            .map(|r| DuplicateCandidate {
                reading_id: r.id,
                has_invoice: invoiced.contains(&r.id),
                has_photo: !r.photo_path.is_empty(),
            })
            .collect();
        // Non-empty by construction.
        let winner = rank_duplicates(&candidates).unwrap();

        for candidate in candidates {
            if candidate.reading_id == winner.reading_id {
                continue;
            }
            if candidate.has_invoice {
                warn!(
                    meter_id,
                    year, month, reading_id = candidate.reading_id,
                    "duplicate reading kept, an invoice references it"
                );
                summary.kept_invoiced += 1;
                continue;
            }
            Reading::delete_by_id(candidate.reading_id).exec(db).await?;
            summary.deleted += 1;
        }
    }

    info!(
        groups = summary.groups,
        deleted = summary.deleted,
        kept_invoiced = summary.kept_invoiced,
        "duplicate reading repair finished"
    );
    Ok(summary)
}
