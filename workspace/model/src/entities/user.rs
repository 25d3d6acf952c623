use sea_orm::entity::prelude::*;

/// An administrative or field-operator account. Only referenced as the actor
/// of payment processing and manual balance adjustments.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(column_name = "nombre_completo")]
    pub full_name: Option<String>,
    #[sea_orm(column_name = "activo", default_value = "true")]
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
    #[sea_orm(has_many = "super::balance_movement::Entity")]
    BalanceMovement,
}

impl ActiveModelBehavior for ActiveModel {}
