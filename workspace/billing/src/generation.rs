//! Monthly invoice generation batch.
//!
//! Each active meter is processed in its own transaction, so one bad meter
//! never poisons the batch. A meter whose invoice already exists for the
//! period is counted as skipped, which makes re-running a period safe. Only
//! a missing tariff aborts the whole run, since every remaining meter would
//! fail the same way.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait};
use tracing::{info, instrument, warn};

use model::entities::generation_run::{self, RunStatus};
use model::entities::prelude::{GenerationRun, Invoice, Meter};
use model::entities::{invoice as invoice_entity, meter, reading};

use crate::error::{BillingError, Result};
use crate::invoice::{self, InvoiceOutcome};
use crate::period::BillingPeriod;
use crate::reading::{self as reading_mod, NewReading};

/// What value to invent when a meter has no reading for the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingReadingValue {
    /// Copy the last known value; the invoiced consumption is zero.
    #[default]
    LastValue,
    /// Write a zero reading.
    Zero,
    /// Last known value plus the last invoiced consumption.
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// Synthesize readings for meters that have none this period.
    pub create_missing_readings: bool,
    pub missing_reading_value: MissingReadingValue,
    /// Treat a value below the previous one as a meter rollover instead of
    /// an error.
    pub allow_rollover: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            create_missing_readings: true,
            missing_reading_value: MissingReadingValue::default(),
            allow_rollover: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterFailure {
    pub meter_id: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub run_id: i32,
    pub period: BillingPeriod,
    pub readings_created: i32,
    pub invoices_created: i32,
    pub skipped: i32,
    pub failures: Vec<MeterFailure>,
    pub duration_ms: i64,
}

/// Dry-run view of a period: what [`run`] would have to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPreview {
    pub period: BillingPeriod,
    pub active_meters: usize,
    pub meters_without_reading: Vec<meter::Model>,
    pub readings_without_invoice: Vec<reading::Model>,
}

enum MeterOutcome {
    Created { reading_synthesized: bool },
    AlreadyInvoiced,
    NoReading,
}

/// Lists the work a generation run would do, without mutating anything.
pub async fn preview<C>(db: &C, period: BillingPeriod) -> Result<GenerationPreview>
where
    C: ConnectionTrait,
{
    let meters = active_meters(db).await?;
    let active_meters = meters.len();

    let mut meters_without_reading = Vec::new();
    let mut readings_without_invoice = Vec::new();
    for m in meters {
        match reading_mod::find_for_period(db, m.id, period).await? {
            None => meters_without_reading.push(m),
            Some(r) => {
                let invoiced = Invoice::find()
                    .filter(invoice_entity::Column::ReadingId.eq(r.id))
                    .one(db)
                    .await?
                    .is_some();
                if !invoiced {
                    readings_without_invoice.push(r);
                }
            }
        }
    }

    Ok(GenerationPreview {
        period,
        active_meters,
        meters_without_reading,
        readings_without_invoice,
    })
}

/// Generates the period's invoices for every active meter and persists a
/// run log row with the counts.
#[instrument(skip(db, policy), fields(period = %period))]
pub async fn run<C>(
    db: &C,
    period: BillingPeriod,
    policy: GenerationPolicy,
    automatic: bool,
    actor: Option<i32>,
) -> Result<GenerationSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    let started_at = Utc::now();
    let log = generation_run::ActiveModel {
        period_year: Set(period.year),
        period_month: Set(period.month as i32),
        automatic: Set(automatic),
        status: Set(RunStatus::Running),
        readings_created: Set(0),
        invoices_created: Set(0),
        skipped: Set(0),
        errors: Set(0),
        message: Set(None),
        started_by: Set(actor),
        started_at: Set(started_at),
        duration_ms: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // Fail fast before touching any meter.
    if let Err(err) = invoice::active_tariff(db).await {
        finish_log(db, log.id, RunStatus::Failed, 0, 0, 0, 0, Some(err.to_string()), started_at)
            .await?;
        return Err(err);
    }

    let mut summary = GenerationSummary {
        run_id: log.id,
        period,
        readings_created: 0,
        invoices_created: 0,
        skipped: 0,
        failures: Vec::new(),
        duration_ms: 0,
    };

    for m in active_meters(db).await? {
        // The transaction must be resolved before the run log is updated,
        // otherwise it would still hold the pooled connection.
        let txn = db.begin().await?;
        let outcome = match process_meter(&txn, &m, period, policy).await {
            Ok(o) => {
                txn.commit().await?;
                Ok(o)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        };
        match outcome {
            Ok(MeterOutcome::Created { reading_synthesized }) => {
                if reading_synthesized {
                    summary.readings_created += 1;
                }
                summary.invoices_created += 1;
            }
            Ok(MeterOutcome::AlreadyInvoiced) | Ok(MeterOutcome::NoReading) => {
                summary.skipped += 1;
            }
            Err(err @ BillingError::MissingTariff) => {
                // Every remaining meter would hit the same wall.
                finish_summary(db, log.id, RunStatus::Failed, &mut summary, Some(err.to_string()), started_at)
                    .await?;
                return Err(err);
            }
            Err(err) => {
                warn!(meter_id = m.id, error = %err, "meter failed, batch continues");
                summary.failures.push(MeterFailure {
                    meter_id: m.id,
                    message: err.to_string(),
                });
            }
        }
    }

    finish_summary(db, log.id, RunStatus::Completed, &mut summary, None, started_at).await?;
    info!(
        run_id = summary.run_id,
        invoices = summary.invoices_created,
        readings = summary.readings_created,
        skipped = summary.skipped,
        failures = summary.failures.len(),
        "generation run finished"
    );
    Ok(summary)
}

async fn process_meter<C>(
    db: &C,
    m: &meter::Model,
    period: BillingPeriod,
    policy: GenerationPolicy,
) -> Result<MeterOutcome>
where
    C: ConnectionTrait,
{
    let (row, reading_synthesized) = match reading_mod::find_for_period(db, m.id, period).await? {
        Some(row) => (row, false),
        None if !policy.create_missing_readings => return Ok(MeterOutcome::NoReading),
        None => {
            let value = synthesized_value(db, m.id, period, policy.missing_reading_value).await?;
            let row = reading_mod::create(
                db,
                NewReading {
                    meter_id: m.id,
                    value_m3: value,
                    reading_date: period.last_day(),
                    photo_path: String::new(),
                    photo_name: None,
                    year: period.year,
                    month: period.month,
                },
            )
            .await?;
            (row, true)
        }
    };

    let outcome =
        invoice::create_for_reading(db, &row, policy.allow_rollover, Utc::now().date_naive())
            .await?;
    match outcome {
        InvoiceOutcome::Created(_) => Ok(MeterOutcome::Created { reading_synthesized }),
        InvoiceOutcome::Existing(_) => Ok(MeterOutcome::AlreadyInvoiced),
    }
}

async fn synthesized_value<C>(
    db: &C,
    meter_id: i32,
    period: BillingPeriod,
    mode: MissingReadingValue,
) -> Result<i32>
where
    C: ConnectionTrait,
{
    match mode {
        MissingReadingValue::Zero => Ok(0),
        MissingReadingValue::LastValue => {
            invoice::previous_reading_value(db, meter_id, period).await
        }
        MissingReadingValue::Estimated => {
            let last = invoice::previous_reading_value(db, meter_id, period).await?;
            // Only invoices before the target period count; backfilling an
            // older period must not extrapolate from newer consumption.
            let last_consumption = Invoice::find()
                .filter(invoice_entity::Column::MeterId.eq(meter_id))
                .filter(invoice::before_period(
                    invoice_entity::Column::PeriodYear,
                    invoice_entity::Column::PeriodMonth,
                    period,
                ))
                .order_by_desc(invoice_entity::Column::PeriodYear)
                .order_by_desc(invoice_entity::Column::PeriodMonth)
                .one(db)
                .await?
                .map(|i| i.consumption_m3)
                .unwrap_or(0);
            Ok(last + last_consumption)
        }
    }
}

async fn active_meters<C>(db: &C) -> Result<Vec<meter::Model>>
where
    C: ConnectionTrait,
{
    Ok(Meter::find()
        .filter(meter::Column::Active.eq(true))
        .order_by_asc(meter::Column::Id)
        .all(db)
        .await?)
}

#[allow(clippy::too_many_arguments)]
async fn finish_log<C>(
    db: &C,
    run_id: i32,
    status: RunStatus,
    readings: i32,
    invoices: i32,
    skipped: i32,
    errors: i32,
    message: Option<String>,
    started_at: chrono::DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let duration_ms = (Utc::now() - started_at).num_milliseconds();
    let mut log: generation_run::ActiveModel = GenerationRun::find_by_id(run_id)
        .one(db)
        .await?
        .ok_or_else(|| BillingError::NotFound(format!("generation run {}", run_id)))?
        .into();
    log.status = Set(status);
    log.readings_created = Set(readings);
    log.invoices_created = Set(invoices);
    log.skipped = Set(skipped);
    log.errors = Set(errors);
    log.message = Set(message);
    log.duration_ms = Set(duration_ms);
    log.update(db).await?;
    Ok(())
}

async fn finish_summary<C>(
    db: &C,
    run_id: i32,
    status: RunStatus,
    summary: &mut GenerationSummary,
    message: Option<String>,
    started_at: chrono::DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    summary.duration_ms = (Utc::now() - started_at).num_milliseconds();
    finish_log(
        db,
        run_id,
        status,
        summary.readings_created,
        summary.invoices_created,
        summary.skipped,
        summary.failures.len() as i32,
        message,
        started_at,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use model::entities::prelude::Reading;
    use rust_decimal::Decimal;

    async fn seed_rates(db: &sea_orm::DatabaseConnection) {
        // 3500.00 fixed, 450.00 per cubic meter
        testing::seed_tariff(db, Decimal::new(350000, 2), Decimal::new(45000, 2)).await;
    }

    #[tokio::test]
    async fn run_invoices_every_active_meter() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Norte").await;
        seed_rates(&db).await;

        let with_reading = testing::seed_meter(&db, client.id, "M-300").await;
        testing::seed_reading(&db, with_reading.id, 2024, 5, 40).await;
        let without_reading = testing::seed_meter(&db, client.id, "M-301").await;
        testing::seed_reading(&db, without_reading.id, 2024, 4, 25).await;

        let period = BillingPeriod::new(2024, 5).unwrap();
        let summary = run(&db, period, GenerationPolicy::default(), false, Some(1))
            .await
            .unwrap();

        assert_eq!(summary.invoices_created, 2);
        assert_eq!(summary.readings_created, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.failures.is_empty());

        // The synthesized reading copied the last value, so consumption 0.
        let synthesized = reading_mod::find_for_period(&db, without_reading.id, period)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synthesized.value_m3, 25);
        assert!(synthesized.photo_path.is_empty());

        let log = GenerationRun::find_by_id(summary.run_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.status, RunStatus::Completed);
        assert_eq!(log.invoices_created, 2);
        assert_eq!(log.readings_created, 1);
    }

    #[tokio::test]
    async fn rerun_skips_already_invoiced_meters() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Sur").await;
        seed_rates(&db).await;
        let m = testing::seed_meter(&db, client.id, "M-302").await;
        testing::seed_reading(&db, m.id, 2024, 5, 40).await;

        let period = BillingPeriod::new(2024, 5).unwrap();
        let first = run(&db, period, GenerationPolicy::default(), false, None)
            .await
            .unwrap();
        let second = run(&db, period, GenerationPolicy::default(), false, None)
            .await
            .unwrap();

        assert_eq!(first.invoices_created, 1);
        assert_eq!(second.invoices_created, 0);
        assert_eq!(second.skipped, 1);
        assert!(second.failures.is_empty());
    }

    #[tokio::test]
    async fn regression_is_recorded_and_the_batch_continues() {
        // Previous invoiced value 120, new reading 115: that meter fails
        // with a negative consumption, the other meter is still invoiced.
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Este").await;
        seed_rates(&db).await;

        let bad = testing::seed_meter(&db, client.id, "M-303").await;
        let april = testing::seed_reading(&db, bad.id, 2024, 4, 120).await;
        invoice::create_for_reading(&db, &april, false, april.reading_date)
            .await
            .unwrap();
        testing::seed_reading(&db, bad.id, 2024, 5, 115).await;

        let good = testing::seed_meter(&db, client.id, "M-304").await;
        testing::seed_reading(&db, good.id, 2024, 5, 33).await;

        let period = BillingPeriod::new(2024, 5).unwrap();
        let summary = run(&db, period, GenerationPolicy::default(), false, None)
            .await
            .unwrap();

        assert_eq!(summary.invoices_created, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].meter_id, bad.id);

        let log = GenerationRun::find_by_id(summary.run_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.errors, 1);
        assert_eq!(log.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn rollover_policy_bills_the_wrapped_meter() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Oeste").await;
        seed_rates(&db).await;

        let m = testing::seed_meter(&db, client.id, "M-305").await;
        let april = testing::seed_reading(&db, m.id, 2024, 4, 9995).await;
        invoice::create_for_reading(&db, &april, false, april.reading_date)
            .await
            .unwrap();
        testing::seed_reading(&db, m.id, 2024, 5, 12).await;

        let policy = GenerationPolicy {
            allow_rollover: true,
            ..Default::default()
        };
        let summary = run(&db, BillingPeriod::new(2024, 5).unwrap(), policy, false, None)
            .await
            .unwrap();
        assert_eq!(summary.invoices_created, 1);
        assert!(summary.failures.is_empty());

        let inv = Invoice::find()
            .filter(invoice_entity::Column::MeterId.eq(m.id))
            .filter(invoice_entity::Column::PeriodMonth.eq(5))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.consumption_m3, 12);
    }

    #[tokio::test]
    async fn missing_tariff_aborts_and_the_log_says_so() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Centro").await;
        let m = testing::seed_meter(&db, client.id, "M-306").await;
        testing::seed_reading(&db, m.id, 2024, 5, 10).await;

        let err = run(
            &db,
            BillingPeriod::new(2024, 5).unwrap(),
            GenerationPolicy::default(),
            false,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BillingError::MissingTariff));

        let log = GenerationRun::find()
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.status, RunStatus::Failed);
        assert_eq!(log.invoices_created, 0);
    }

    #[tokio::test]
    async fn failed_meter_leaves_no_synthesized_reading_behind() {
        // The synthesized Zero reading causes a regression against the
        // previous invoice; the rollback must remove the reading too.
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Alta").await;
        seed_rates(&db).await;
        let m = testing::seed_meter(&db, client.id, "M-307").await;
        let april = testing::seed_reading(&db, m.id, 2024, 4, 80).await;
        invoice::create_for_reading(&db, &april, false, april.reading_date)
            .await
            .unwrap();

        let policy = GenerationPolicy {
            missing_reading_value: MissingReadingValue::Zero,
            ..Default::default()
        };
        let period = BillingPeriod::new(2024, 5).unwrap();
        let summary = run(&db, period, policy, false, None).await.unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.readings_created, 0);
        assert!(reading_mod::find_for_period(&db, m.id, period)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn estimated_value_extends_the_last_consumption() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Baja").await;
        seed_rates(&db).await;
        let m = testing::seed_meter(&db, client.id, "M-308").await;
        let march = testing::seed_reading(&db, m.id, 2024, 3, 100).await;
        invoice::create_for_reading(&db, &march, false, march.reading_date)
            .await
            .unwrap();
        let april = testing::seed_reading(&db, m.id, 2024, 4, 130).await;
        invoice::create_for_reading(&db, &april, false, april.reading_date)
            .await
            .unwrap();

        let policy = GenerationPolicy {
            missing_reading_value: MissingReadingValue::Estimated,
            ..Default::default()
        };
        let period = BillingPeriod::new(2024, 5).unwrap();
        run(&db, period, policy, false, None).await.unwrap();

        // 130 + (130 - 100)
        let synthesized = reading_mod::find_for_period(&db, m.id, period)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synthesized.value_m3, 160);
    }

    #[tokio::test]
    async fn estimate_for_a_backfilled_period_ignores_newer_invoices() {
        // Invoice for May exists; estimating March must not see it.
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Alta").await;
        seed_rates(&db).await;
        let m = testing::seed_meter(&db, client.id, "M-312").await;
        let may = testing::seed_reading(&db, m.id, 2024, 5, 60).await;
        invoice::create_for_reading(&db, &may, false, may.reading_date)
            .await
            .unwrap();

        let policy = GenerationPolicy {
            missing_reading_value: MissingReadingValue::Estimated,
            ..Default::default()
        };
        let period = BillingPeriod::new(2024, 3).unwrap();
        run(&db, period, policy, false, None).await.unwrap();

        // Nothing precedes March for this meter, so the estimate is zero.
        let synthesized = reading_mod::find_for_period(&db, m.id, period)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synthesized.value_m3, 0);
    }

    #[tokio::test]
    async fn preview_reports_pending_work_without_writing() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Junta Nueva").await;
        seed_rates(&db).await;

        let invoiced = testing::seed_meter(&db, client.id, "M-309").await;
        let r = testing::seed_reading(&db, invoiced.id, 2024, 5, 20).await;
        invoice::create_for_reading(&db, &r, false, r.reading_date).await.unwrap();

        let read_only = testing::seed_meter(&db, client.id, "M-310").await;
        testing::seed_reading(&db, read_only.id, 2024, 5, 30).await;

        let bare = testing::seed_meter(&db, client.id, "M-311").await;

        let period = BillingPeriod::new(2024, 5).unwrap();
        let view = preview(&db, period).await.unwrap();
        assert_eq!(view.active_meters, 3);
        assert_eq!(view.meters_without_reading.len(), 1);
        assert_eq!(view.meters_without_reading[0].id, bare.id);
        assert_eq!(view.readings_without_invoice.len(), 1);
        assert_eq!(view.readings_without_invoice[0].meter_id, read_only.id);

        assert_eq!(Reading::find().all(&db).await.unwrap().len(), 2);
    }
}
