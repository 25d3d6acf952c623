use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// A water meter installed at a client's property. Soft-deactivated with a
/// date and reason; readings and invoices hang off the meter.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "medidores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "cliente_id")]
    pub client_id: i32,
    #[sea_orm(column_name = "numero_medidor")]
    pub meter_number: Option<String>,
    #[sea_orm(column_name = "direccion")]
    pub address: Option<String>,
    #[sea_orm(column_name = "activo", default_value = "true")]
    pub active: bool,
    #[sea_orm(column_name = "fecha_instalacion")]
    pub installed_on: Option<NaiveDate>,
    #[sea_orm(column_name = "fecha_baja")]
    pub deactivated_on: Option<NaiveDate>,
    #[sea_orm(column_name = "motivo_baja")]
    pub deactivation_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::reading::Entity")]
    Reading,
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::reading::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reading.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
