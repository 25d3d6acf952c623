use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// Billing rates: a fixed monthly charge plus a per-cubic-meter price.
/// Replacing the rates inserts a new row and deactivates the old one, so
/// issued invoices keep the rates they were computed with.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tarifas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "cargo_fijo", column_type = "Decimal(Some((12, 2)))")]
    pub fixed_charge: Decimal,
    #[sea_orm(column_name = "precio_m3", column_type = "Decimal(Some((12, 2)))")]
    pub price_per_m3: Decimal,
    #[sea_orm(column_name = "activo", default_value = "true")]
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
