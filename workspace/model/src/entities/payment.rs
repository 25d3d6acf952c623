use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// Lifecycle state of a payment. Allocation runs exactly once, on the
/// transition to `Approved`; a rejected payment never touches invoices or
/// the client balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pendiente")]
    Pending,
    #[sea_orm(string_value = "aprobado")]
    Approved,
    #[sea_orm(string_value = "rechazado")]
    Rejected,
}

/// A single inbound payment event for a client.
/// Invariant: `amount_applied + amount_as_credit <= declared_amount`; both
/// stay zero until the payment is approved, and sum to the declared amount
/// once it is.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pagos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `PAG-YYYYMM-XXXX`, sequential within the submission month.
    #[sea_orm(column_name = "numero_pago", unique)]
    pub payment_number: String,
    #[sea_orm(column_name = "cliente_id")]
    pub client_id: i32,
    #[sea_orm(column_name = "monto_total", column_type = "Decimal(Some((12, 2)))")]
    pub declared_amount: Decimal,
    #[sea_orm(column_name = "monto_aplicado", column_type = "Decimal(Some((12, 2)))")]
    pub amount_applied: Decimal,
    #[sea_orm(column_name = "monto_a_favor", column_type = "Decimal(Some((12, 2)))")]
    pub amount_as_credit: Decimal,
    #[sea_orm(column_name = "estado")]
    pub status: PaymentStatus,
    #[sea_orm(column_name = "metodo_pago")]
    pub method: Option<String>,
    /// Reference to the proof-of-payment artifact (comprobante).
    #[sea_orm(column_name = "comprobante_path")]
    pub receipt_path: Option<String>,
    #[sea_orm(column_name = "notas")]
    pub notes: Option<String>,
    #[sea_orm(column_name = "fecha_pago")]
    pub paid_on: Option<NaiveDate>,
    #[sea_orm(column_name = "fecha_envio")]
    pub submitted_on: NaiveDate,
    #[sea_orm(column_name = "fecha_procesamiento")]
    pub processed_on: Option<NaiveDate>,
    #[sea_orm(column_name = "procesado_por")]
    pub processed_by: Option<i32>,
    #[sea_orm(column_name = "motivo_rechazo")]
    pub rejection_reason: Option<String>,
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
        belongs_to = "super::user::Entity",
        from = "Column::ProcessedBy",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::payment_invoice::Entity")]
    PaymentInvoice,
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

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_invoice::Relation::Invoice.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::payment_invoice::Relation::Payment.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
