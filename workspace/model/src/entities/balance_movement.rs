use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// Direction of a balance movement. `amount` carries the signed delta; the
/// kind is redundant with its sign but makes the ledger readable in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum MovementKind {
    #[sea_orm(string_value = "ingreso")]
    Credit,
    #[sea_orm(string_value = "egreso")]
    Debit,
}

/// What caused a balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum MovementOrigin {
    /// Surplus of an approved payment after all outstanding invoices.
    #[sea_orm(string_value = "excedente_pago")]
    PaymentSurplus,
    /// Existing credit consumed against outstanding invoices.
    #[sea_orm(string_value = "aplicacion_boleta")]
    InvoiceApplication,
    /// Administrator correction.
    #[sea_orm(string_value = "ajuste_manual")]
    ManualAdjustment,
}

/// Append-only audit row: one per change to a client's available balance,
/// capturing the before/after values. Never updated or deleted; the sum of
/// all `amount` values for a client must equal the stored balance.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "movimientos_saldo")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "cliente_id")]
    pub client_id: i32,
    #[sea_orm(column_name = "tipo")]
    pub kind: MovementKind,
    #[sea_orm(column_name = "origen")]
    pub origin: MovementOrigin,
    /// Signed delta applied to the balance.
    #[sea_orm(column_name = "monto", column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_name = "saldo_anterior", column_type = "Decimal(Some((12, 2)))")]
    pub balance_before: Decimal,
    #[sea_orm(column_name = "saldo_nuevo", column_type = "Decimal(Some((12, 2)))")]
    pub balance_after: Decimal,
    #[sea_orm(column_name = "pago_id")]
    pub payment_id: Option<i32>,
    #[sea_orm(column_name = "boleta_id")]
    pub invoice_id: Option<i32>,
    #[sea_orm(column_name = "usuario_id")]
    pub user_id: Option<i32>,
    #[sea_orm(column_name = "descripcion")]
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
