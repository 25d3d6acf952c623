//! This file serves as the root for all SeaORM entity modules.
//! Table and column names follow the persisted Spanish schema of the
//! original billing system; Rust-side names are English and mapped with
//! `column_name` where they differ.

pub mod balance_movement;
pub mod client;
pub mod client_balance;
pub mod generation_run;
pub mod invoice;
pub mod meter;
pub mod payment;
pub mod payment_invoice;
pub mod reading;
pub mod tariff;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::balance_movement::Entity as BalanceMovement;
    pub use super::client::Entity as Client;
    pub use super::client_balance::Entity as ClientBalance;
    pub use super::generation_run::Entity as GenerationRun;
    pub use super::invoice::Entity as Invoice;
    pub use super::meter::Entity as Meter;
    pub use super::payment::Entity as Payment;
    pub use super::payment_invoice::Entity as PaymentInvoice;
    pub use super::reading::Entity as Reading;
    pub use super::tariff::Entity as Tariff;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let admin = user::ActiveModel {
            username: Set("admin".to_string()),
            full_name: Set(Some("Administrator".to_string())),
            active: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let client = client::ActiveModel {
            name: Set("Perez".to_string()),
            full_name: Set(Some("Juan Perez".to_string())),
            phone: Set(Some("+56 9 1234 5678".to_string())),
            email: Set(None),
            address: Set(Some("Camino El Alba 12".to_string())),
            active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let meter = meter::ActiveModel {
            client_id: Set(client.id),
            meter_number: Set(Some("M-001".to_string())),
            address: Set(None),
            active: Set(true),
            installed_on: Set(NaiveDate::from_ymd_opt(2023, 5, 1)),
            deactivated_on: Set(None),
            deactivation_reason: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let reading = reading::ActiveModel {
            meter_id: Set(meter.id),
            value_m3: Set(120),
            reading_date: Set(NaiveDate::from_ymd_opt(2024, 1, 28).unwrap()),
            photo_path: Set("fotos/2024/01/m001.jpg".to_string()),
            photo_name: Set(Some("m001.jpg".to_string())),
            year: Set(2024),
            month: Set(1),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // A second reading for the same (meter, period) must be rejected by
        // the unique index.
        let duplicate = reading::ActiveModel {
            meter_id: Set(meter.id),
            value_m3: Set(121),
            reading_date: Set(NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()),
            photo_path: Set(String::new()),
            photo_name: Set(None),
            year: Set(2024),
            month: Set(1),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());

        let tariff = tariff::ActiveModel {
            fixed_charge: Set(Decimal::new(2_000_00, 2)),
            price_per_m3: Set(Decimal::new(450_00, 2)),
            active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let invoice = invoice::ActiveModel {
            invoice_number: Set("BOL-202401-0001".to_string()),
            reading_id: Set(reading.id),
            meter_id: Set(meter.id),
            period_year: Set(2024),
            period_month: Set(1),
            previous_reading: Set(100),
            current_reading: Set(120),
            consumption_m3: Set(20),
            fixed_charge: Set(tariff.fixed_charge),
            price_per_m3: Set(tariff.price_per_m3),
            subtotal: Set(Decimal::new(9_000_00, 2)),
            total: Set(Decimal::new(11_000_00, 2)),
            outstanding_balance: Set(Decimal::new(11_000_00, 2)),
            amount_paid: Set(Decimal::ZERO),
            issued_on: Set(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            paid_on: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let payment = payment::ActiveModel {
            payment_number: Set("PAG-202402-0001".to_string()),
            client_id: Set(client.id),
            declared_amount: Set(Decimal::new(15_000_00, 2)),
            amount_applied: Set(Decimal::ZERO),
            amount_as_credit: Set(Decimal::ZERO),
            status: Set(payment::PaymentStatus::Pending),
            method: Set(Some("transferencia".to_string())),
            receipt_path: Set(Some("comprobantes/123.jpg".to_string())),
            notes: Set(None),
            paid_on: Set(NaiveDate::from_ymd_opt(2024, 2, 3)),
            submitted_on: Set(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()),
            processed_on: Set(None),
            processed_by: Set(None),
            rejection_reason: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let link = payment_invoice::ActiveModel {
            payment_id: Set(payment.id),
            invoice_id: Set(invoice.id),
            amount_applied: Set(Decimal::new(11_000_00, 2)),
            settles_invoice: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // One link per (payment, invoice).
        let duplicate_link = payment_invoice::ActiveModel {
            payment_id: Set(payment.id),
            invoice_id: Set(invoice.id),
            amount_applied: Set(Decimal::ONE),
            settles_invoice: Set(false),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate_link.is_err());

        let balance = client_balance::ActiveModel {
            client_id: Set(client.id),
            available: Set(Decimal::new(4_000_00, 2)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let movement = balance_movement::ActiveModel {
            client_id: Set(client.id),
            kind: Set(balance_movement::MovementKind::Credit),
            origin: Set(balance_movement::MovementOrigin::PaymentSurplus),
            amount: Set(Decimal::new(4_000_00, 2)),
            balance_before: Set(Decimal::ZERO),
            balance_after: Set(Decimal::new(4_000_00, 2)),
            payment_id: Set(Some(payment.id)),
            invoice_id: Set(None),
            user_id: Set(Some(admin.id)),
            description: Set(Some("Excedente del pago PAG-202402-0001".to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let run = generation_run::ActiveModel {
            period_year: Set(2024),
            period_month: Set(1),
            automatic: Set(false),
            status: Set(generation_run::RunStatus::Completed),
            readings_created: Set(1),
            invoices_created: Set(1),
            skipped: Set(0),
            errors: Set(0),
            message: Set(None),
            started_by: Set(Some(admin.id)),
            started_at: Set(Utc::now()),
            duration_ms: Set(12),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Read back and verify the relations resolve.
        let meters = Meter::find()
            .filter(meter::Column::ClientId.eq(client.id))
            .all(&db)
            .await?;
        assert_eq!(meters.len(), 1);

        let invoice_for_reading = Invoice::find()
            .filter(invoice::Column::ReadingId.eq(reading.id))
            .one(&db)
            .await?;
        assert_eq!(invoice_for_reading.map(|i| i.id), Some(invoice.id));

        let links = PaymentInvoice::find()
            .filter(payment_invoice::Column::PaymentId.eq(payment.id))
            .all(&db)
            .await?;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, link.id);
        assert!(links[0].settles_invoice);

        let stored_balance = ClientBalance::find()
            .filter(client_balance::Column::ClientId.eq(client.id))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(stored_balance.id, balance.id);
        assert_eq!(stored_balance.available, movement.balance_after);

        // The user relations resolve from both referencing tables.
        let movement_actor = movement.find_related(User).one(&db).await?;
        assert_eq!(movement_actor.map(|u| u.username), Some("admin".to_string()));
        let payment_processor = payment.find_related(User).one(&db).await?;
        assert!(payment_processor.is_none());

        let runs = GenerationRun::find().all(&db).await?;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run.id);

        // A second balance row for the same client is rejected.
        let duplicate_balance = client_balance::ActiveModel {
            client_id: Set(client.id),
            available: Set(Decimal::ZERO),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate_balance.is_err());

        Ok(())
    }
}
