use sea_orm::entity::prelude::*;
use rust_decimal::Decimal;

/// Join row recording how much of one payment was applied to one invoice.
/// Unique on (payment, invoice); an invoice can accumulate several rows
/// over time from partial payments.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pago_boletas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "pago_id")]
    pub payment_id: i32,
    #[sea_orm(column_name = "boleta_id")]
    pub invoice_id: i32,
    #[sea_orm(column_name = "monto_aplicado", column_type = "Decimal(Some((12, 2)))")]
    pub amount_applied: Decimal,
    /// True when this application brought the invoice's outstanding balance
    /// to zero.
    #[sea_orm(column_name = "es_pago_completo")]
    pub settles_invoice: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
