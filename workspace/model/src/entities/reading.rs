use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// A meter value captured for one billing period. At most one per
/// (meter, year, month), enforced by a unique index. Immutable once an
/// invoice references it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lecturas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "medidor_id")]
    pub meter_id: i32,
    /// Cumulative meter value in cubic meters.
    #[sea_orm(column_name = "lectura_m3")]
    pub value_m3: i32,
    #[sea_orm(column_name = "fecha_lectura")]
    pub reading_date: NaiveDate,
    /// Empty for synthesized readings.
    #[sea_orm(column_name = "foto_path")]
    pub photo_path: String,
    #[sea_orm(column_name = "foto_nombre")]
    pub photo_name: Option<String>,
    #[sea_orm(column_name = "anio")]
    pub year: i32,
    #[sea_orm(column_name = "mes")]
    pub month: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meter::Entity",
        from = "Column::MeterId",
        to = "super::meter::Column::Id"
    )]
    Meter,
    #[sea_orm(has_one = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::meter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meter.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
