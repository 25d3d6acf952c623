use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// A monthly charge document (boleta) generated from exactly one reading.
/// The balance columns are mutated only by the payment allocator and hold
/// `outstanding_balance + amount_paid == total` at all times.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "boletas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "numero_boleta", unique)]
    pub invoice_number: String,
    #[sea_orm(column_name = "lectura_id", unique)]
    pub reading_id: i32,
    #[sea_orm(column_name = "medidor_id")]
    pub meter_id: i32,
    #[sea_orm(column_name = "periodo_anio")]
    pub period_year: i32,
    #[sea_orm(column_name = "periodo_mes")]
    pub period_month: i32,
    #[sea_orm(column_name = "lectura_anterior")]
    pub previous_reading: i32,
    #[sea_orm(column_name = "lectura_actual")]
    pub current_reading: i32,
    #[sea_orm(column_name = "consumo_m3")]
    pub consumption_m3: i32,
    #[sea_orm(column_name = "cargo_fijo", column_type = "Decimal(Some((12, 2)))")]
    pub fixed_charge: Decimal,
    #[sea_orm(column_name = "precio_m3", column_type = "Decimal(Some((12, 2)))")]
    pub price_per_m3: Decimal,
    #[sea_orm(column_name = "subtotal_consumo", column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    #[sea_orm(column_name = "saldo_pendiente", column_type = "Decimal(Some((12, 2)))")]
    pub outstanding_balance: Decimal,
    #[sea_orm(column_name = "monto_pagado", column_type = "Decimal(Some((12, 2)))")]
    pub amount_paid: Decimal,
    #[sea_orm(column_name = "fecha_emision")]
    pub issued_on: NaiveDate,
    /// Set when the outstanding balance first reaches zero.
    #[sea_orm(column_name = "fecha_pago")]
    pub paid_on: Option<NaiveDate>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meter::Entity",
        from = "Column::MeterId",
        to = "super::meter::Column::Id"
    )]
    Meter,
    #[sea_orm(
        belongs_to = "super::reading::Entity",
        from = "Column::ReadingId",
        to = "super::reading::Column::Id"
    )]
    Reading,
    #[sea_orm(has_many = "super::payment_invoice::Entity")]
    PaymentInvoice,
}

impl Related<super::meter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meter.def()
    }
}

impl Related<super::reading::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reading.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_invoice::Relation::Payment.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::payment_invoice::Relation::Invoice.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
