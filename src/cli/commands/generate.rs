use anyhow::Result;
use sea_orm::Database;
use tracing::{error, info, warn};

use billing::generation::{self, GenerationPolicy};
use billing::BillingPeriod;

/// Runs the invoice generation batch for one period from the command line.
/// This is the entry point the external scheduler calls.
pub async fn generate(
    database_url: &str,
    year: i32,
    month: u32,
    no_missing_readings: bool,
    allow_rollover: bool,
) -> Result<()> {
    info!("Starting invoice generation for {}-{:02}", year, month);

    let period = BillingPeriod::new(year, month)?;
    let db = Database::connect(database_url).await?;

    let policy = GenerationPolicy {
        create_missing_readings: !no_missing_readings,
        allow_rollover,
        ..Default::default()
    };

    let summary = match generation::run(&db, period, policy, true, None).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Generation run failed: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Generation run {} finished in {} ms: {} invoices, {} readings synthesized, {} skipped",
        summary.run_id,
        summary.duration_ms,
        summary.invoices_created,
        summary.readings_created,
        summary.skipped
    );
    for failure in &summary.failures {
        warn!("Meter {} failed: {}", failure.meter_id, failure.message);
    }

    Ok(())
}
