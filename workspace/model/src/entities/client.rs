use sea_orm::entity::prelude::*;

/// A water-service client. Owns zero or more meters and exactly one balance
/// row. Never hard-deleted; `active` is flipped off instead.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clientes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "nombre", unique)]
    pub name: String,
    #[sea_orm(column_name = "nombre_completo")]
    pub full_name: Option<String>,
    #[sea_orm(column_name = "telefono")]
    pub phone: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_name = "direccion")]
    pub address: Option<String>,
    #[sea_orm(column_name = "activo", default_value = "true")]
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::meter::Entity")]
    Meter,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
    #[sea_orm(has_one = "super::client_balance::Entity")]
    ClientBalance,
    #[sea_orm(has_many = "super::balance_movement::Entity")]
    BalanceMovement,
}

impl Related<super::meter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meter.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::client_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientBalance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
