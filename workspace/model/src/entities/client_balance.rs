use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// The single current available-credit row per client. Mutated only through
/// `billing::balance::adjust`, which appends a movement row in the same
/// transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "saldos_cliente")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "cliente_id", unique)]
    pub client_id: i32,
    #[sea_orm(column_name = "saldo_disponible", column_type = "Decimal(Some((12, 2)))")]
    pub available: Decimal,
    #[sea_orm(column_name = "ultima_actualizacion")]
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
