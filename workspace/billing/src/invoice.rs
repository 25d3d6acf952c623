//! Invoice construction from readings.
//!
//! One invoice per reading, one reading per (meter, period). The amounts are
//! frozen at creation time from the active tariff; later tariff changes never
//! touch issued invoices.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, ConnectionTrait, QueryOrder, QuerySelect, Set};
use tracing::{debug, instrument};

use model::entities::prelude::{Invoice, Reading, Tariff};
use model::entities::{invoice, reading, tariff};

use crate::error::{BillingError, Result};
use crate::period::BillingPeriod;

/// Outcome of asking for an invoice for a reading.
#[derive(Debug, Clone)]
pub enum InvoiceOutcome {
    Created(invoice::Model),
    /// An invoice for this reading or (meter, period) already exists.
    Existing(invoice::Model),
}

impl InvoiceOutcome {
    pub fn model(&self) -> &invoice::Model {
        match self {
            InvoiceOutcome::Created(m) | InvoiceOutcome::Existing(m) => m,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, InvoiceOutcome::Created(_))
    }
}

/// Consumption in cubic meters between two cumulative meter values.
///
/// A current value below the previous one means either a meter rollover
/// (counter wrapped or was replaced) or a bad reading. With `allow_rollover`
/// the count restarts from zero, so the current value alone is billed;
/// otherwise the caller gets [`BillingError::NegativeConsumption`] and must
/// fix the reading.
pub fn compute_consumption(
    meter_id: i32,
    previous: i32,
    current: i32,
    allow_rollover: bool,
) -> Result<i32> {
    if current >= previous {
        return Ok(current - previous);
    }
    if allow_rollover {
        return Ok(current);
    }
    Err(BillingError::NegativeConsumption {
        meter_id,
        previous,
        current,
    })
}

/// The most recent active tariff.
pub async fn active_tariff<C>(db: &C) -> Result<tariff::Model>
where
    C: ConnectionTrait,
{
    Tariff::find()
        .filter(tariff::Column::Active.eq(true))
        .order_by_desc(tariff::Column::Id)
        .one(db)
        .await?
        .ok_or(BillingError::MissingTariff)
}

/// Baseline meter value for consumption in the given period: the current
/// reading of the meter's latest invoice, else the latest reading strictly
/// before the period, else 0 (new meter).
pub async fn previous_reading_value<C>(
    db: &C,
    meter_id: i32,
    period: BillingPeriod,
) -> Result<i32>
where
    C: ConnectionTrait,
{
    let last_invoice = Invoice::find()
        .filter(invoice::Column::MeterId.eq(meter_id))
        .filter(before_period(
            invoice::Column::PeriodYear,
            invoice::Column::PeriodMonth,
            period,
        ))
        .order_by_desc(invoice::Column::PeriodYear)
        .order_by_desc(invoice::Column::PeriodMonth)
        .one(db)
        .await?;
    if let Some(inv) = last_invoice {
        return Ok(inv.current_reading);
    }

    let last_reading = Reading::find()
        .filter(reading::Column::MeterId.eq(meter_id))
        .filter(before_period(
            reading::Column::Year,
            reading::Column::Month,
            period,
        ))
        .order_by_desc(reading::Column::Year)
        .order_by_desc(reading::Column::Month)
        .one(db)
        .await?;
    Ok(last_reading.map(|r| r.value_m3).unwrap_or(0))
}

/// Next free `BOL-YYYYMM-XXXX` number for the period.
pub async fn next_invoice_number<C>(db: &C, period: BillingPeriod) -> Result<String>
where
    C: ConnectionTrait,
{
    let prefix = format!("BOL-{}-", period.compact());
    next_document_number(db, &prefix).await
}

pub(crate) async fn next_document_number<C>(db: &C, prefix: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    // Both invoice and payment numbers share the PREFIX-XXXX shape; the max
    // suffix query only touches the invoice table for BOL prefixes and the
    // payment table for PAG prefixes.
    let numbers: Vec<String> = if prefix.starts_with("BOL-") {
        Invoice::find()
            .select_only()
            .column(invoice::Column::InvoiceNumber)
            .filter(invoice::Column::InvoiceNumber.starts_with(prefix))
            .into_tuple()
            .all(db)
            .await?
    } else {
        use model::entities::payment;
        model::entities::prelude::Payment::find()
            .select_only()
            .column(payment::Column::PaymentNumber)
            .filter(payment::Column::PaymentNumber.starts_with(prefix))
            .into_tuple()
            .all(db)
            .await?
    };

    let max_suffix = numbers
        .iter()
        .filter_map(|n| n.rsplit('-').next())
        .filter_map(|s| s.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    Ok(format!("{}{:04}", prefix, max_suffix + 1))
}

/// Creates the invoice for a reading, or returns the existing one.
///
/// Numbers, amounts and the previous reading are all resolved here so the
/// caller only needs the reading row and the policy's rollover choice. Must
/// run inside the caller's transaction when used by batch generation.
#[instrument(skip(db, row), fields(reading_id = row.id, meter_id = row.meter_id))]
pub async fn create_for_reading<C>(
    db: &C,
    row: &reading::Model,
    allow_rollover: bool,
    issued_on: NaiveDate,
) -> Result<InvoiceOutcome>
where
    C: ConnectionTrait,
{
    let period = BillingPeriod::new(row.year, row.month as u32)?;

    if let Some(existing) = Invoice::find()
        .filter(invoice::Column::MeterId.eq(row.meter_id))
        .filter(invoice::Column::PeriodYear.eq(period.year))
        .filter(invoice::Column::PeriodMonth.eq(period.month as i32))
        .one(db)
        .await?
    {
        debug!(invoice_id = existing.id, "invoice already exists for period");
        return Ok(InvoiceOutcome::Existing(existing));
    }

    let rates = active_tariff(db).await?;
    let previous = previous_reading_value(db, row.meter_id, period).await?;
    let consumption = compute_consumption(row.meter_id, previous, row.value_m3, allow_rollover)?;

    let subtotal = (Decimal::from(consumption) * rates.price_per_m3).round_dp(2);
    let total = (rates.fixed_charge + subtotal).round_dp(2);
    let number = next_invoice_number(db, period).await?;

    let created = invoice::ActiveModel {
        invoice_number: Set(number),
        reading_id: Set(row.id),
        meter_id: Set(row.meter_id),
        period_year: Set(period.year),
        period_month: Set(period.month as i32),
        previous_reading: Set(previous),
        current_reading: Set(row.value_m3),
        consumption_m3: Set(consumption),
        fixed_charge: Set(rates.fixed_charge),
        price_per_m3: Set(rates.price_per_m3),
        subtotal: Set(subtotal),
        total: Set(total),
        outstanding_balance: Set(total),
        amount_paid: Set(Decimal::ZERO),
        issued_on: Set(issued_on),
        paid_on: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(InvoiceOutcome::Created(created))
}

/// Outstanding invoices for a client, oldest period first. This is the order
/// the payment allocator settles them in.
pub async fn outstanding_for_client<C>(db: &C, client_id: i32) -> Result<Vec<invoice::Model>>
where
    C: ConnectionTrait,
{
    use model::entities::meter;
    use model::entities::prelude::Meter;

    let meter_ids: Vec<i32> = Meter::find()
        .select_only()
        .column(meter::Column::Id)
        .filter(meter::Column::ClientId.eq(client_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(Invoice::find()
        .filter(invoice::Column::MeterId.is_in(meter_ids))
        .filter(invoice::Column::OutstandingBalance.gt(Decimal::ZERO))
        .order_by_asc(invoice::Column::PeriodYear)
        .order_by_asc(invoice::Column::PeriodMonth)
        .order_by_asc(invoice::Column::Id)
        .all(db)
        .await?)
}

pub(crate) fn before_period<Y, M>(year_col: Y, month_col: M, period: BillingPeriod) -> Condition
where
    Y: ColumnTrait,
    M: ColumnTrait,
{
    Condition::any()
        .add(year_col.lt(period.year))
        .add(
            Condition::all()
                .add(year_col.eq(period.year))
                .add(month_col.lt(period.month as i32)),
        )
}
