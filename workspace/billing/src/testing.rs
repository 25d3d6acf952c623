//! Shared fixtures for the module tests: an in-memory database with the full
//! schema applied plus seed helpers for the common rows. `setup_db` also
//! creates the `admin` user (id 1) so tests can pass an actor without extra
//! setup.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, Set};

use migration::{Migrator, MigratorTrait};
use model::entities::balance_movement::{MovementKind, MovementOrigin};
use model::entities::{client, invoice, meter, reading, tariff, user};

use crate::balance::{self, BalanceChange};
use crate::period::BillingPeriod;

pub async fn setup_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
    Migrator::up(&db, None).await.expect("Migrations failed.");

    user::ActiveModel {
        username: Set("admin".to_string()),
        full_name: Set(Some("Administrador".to_string())),
        active: Set(true),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    Ok(db)
}

pub async fn seed_client(db: &DatabaseConnection, name: &str) -> client::Model {
    client::ActiveModel {
        name: Set(name.to_string()),
        full_name: Set(Some(name.to_string())),
        phone: Set(None),
        email: Set(None),
        address: Set(None),
        active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed client")
}

pub async fn seed_meter(db: &DatabaseConnection, client_id: i32, number: &str) -> meter::Model {
    meter::ActiveModel {
        client_id: Set(client_id),
        meter_number: Set(Some(number.to_string())),
        address: Set(None),
        active: Set(true),
        installed_on: Set(None),
        deactivated_on: Set(None),
        deactivation_reason: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed meter")
}

pub async fn seed_tariff(
    db: &DatabaseConnection,
    fixed_charge: Decimal,
    price_per_m3: Decimal,
) -> tariff::Model {
    tariff::ActiveModel {
        fixed_charge: Set(fixed_charge),
        price_per_m3: Set(price_per_m3),
        active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed tariff")
}

pub async fn seed_reading(
    db: &DatabaseConnection,
    meter_id: i32,
    year: i32,
    month: u32,
    value_m3: i32,
) -> reading::Model {
    let period = BillingPeriod::new(year, month).expect("valid period");
    reading::ActiveModel {
        meter_id: Set(meter_id),
        value_m3: Set(value_m3),
        reading_date: Set(period.last_day()),
        photo_path: Set(format!("fotos/{}/{}.jpg", meter_id, period.compact())),
        photo_name: Set(Some(format!("{}.jpg", period.compact()))),
        year: Set(year),
        month: Set(month as i32),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed reading")
}

/// Inserts a fully outstanding invoice for the period, creating the backing
/// reading as well.
pub async fn seed_invoice(
    db: &DatabaseConnection,
    meter_id: i32,
    year: i32,
    month: u32,
    total: Decimal,
) -> invoice::Model {
    let period = BillingPeriod::new(year, month).expect("valid period");
    let backing = seed_reading(db, meter_id, year, month, 10).await;
    let number = crate::invoice::next_invoice_number(db, period)
        .await
        .expect("invoice number");

    invoice::ActiveModel {
        invoice_number: Set(number),
        reading_id: Set(backing.id),
        meter_id: Set(meter_id),
        period_year: Set(period.year),
        period_month: Set(period.month as i32),
        previous_reading: Set(0),
        current_reading: Set(backing.value_m3),
        consumption_m3: Set(backing.value_m3),
        fixed_charge: Set(Decimal::ZERO),
        price_per_m3: Set(Decimal::ZERO),
        subtotal: Set(total),
        total: Set(total),
        outstanding_balance: Set(total),
        amount_paid: Set(Decimal::ZERO),
        issued_on: Set(period.last_day()),
        paid_on: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed invoice")
}

/// Gives the client credit through the regular accessor so the movement
/// trail stays consistent.
pub async fn seed_credit(db: &DatabaseConnection, client_id: i32, amount: Decimal) {
    balance::adjust(
        db,
        client_id,
        BalanceChange {
            kind: MovementKind::Credit,
            origin: MovementOrigin::ManualAdjustment,
            amount,
            payment_id: None,
            invoice_id: None,
            user_id: Some(1),
            description: Some("Saldo inicial de prueba".to_string()),
        },
    )
    .await
    .expect("seed credit");
}
