//! Payment intake and allocation.
//!
//! A payment is registered as `pendiente` and touches nothing else. Approval
//! runs the allocation exactly once inside one transaction: the state
//! transition is a guarded update filtered on the pending state, so a second
//! approver sees zero affected rows and gets `AlreadyProcessed` instead of a
//! double allocation.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, Set, TransactionTrait};
use tracing::{info, instrument};

use model::entities::balance_movement::{MovementKind, MovementOrigin};
use model::entities::payment::{self, PaymentStatus};
use model::entities::prelude::{Client, Payment};
use model::entities::{invoice, payment_invoice};

use crate::balance::{self, BalanceChange};
use crate::error::{BillingError, Result};
use crate::invoice::{next_document_number, outstanding_for_client};
use crate::period::BillingPeriod;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub client_id: i32,
    pub declared_amount: Decimal,
    pub method: Option<String>,
    pub receipt_path: Option<String>,
    pub notes: Option<String>,
    /// Date the client says they paid; defaults to the submission date.
    pub paid_on: Option<NaiveDate>,
}

/// One invoice touched by an allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceApplication {
    pub invoice_id: i32,
    pub invoice_number: String,
    pub amount: Decimal,
    pub settles_invoice: bool,
}

/// What approval did with the money.
///
/// `amount_applied + amount_as_credit == declared_amount` always holds;
/// `credit_used` is pre-existing credit spent on top of the payment funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationReport {
    pub payment_id: i32,
    pub payment_number: String,
    pub amount_applied: Decimal,
    pub amount_as_credit: Decimal,
    pub credit_used: Decimal,
    pub applications: Vec<InvoiceApplication>,
}

/// Records a pending payment. No invoice or balance is touched until
/// approval.
#[instrument(skip(db, new), fields(client_id = new.client_id, amount = %new.declared_amount))]
pub async fn register_payment<C>(db: &C, new: NewPayment) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    if new.declared_amount <= Decimal::ZERO {
        return Err(BillingError::InvalidAmount(format!(
            "declared payment amount must be positive, got {}",
            new.declared_amount
        )));
    }
    // The column holds 2 decimal places; normalize here instead of letting
    // the backend round silently.
    let new = NewPayment {
        declared_amount: new.declared_amount.round_dp(2),
        ..new
    };
    insert_payment(db, new).await
}

async fn insert_payment<C>(db: &C, new: NewPayment) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    if Client::find_by_id(new.client_id).one(db).await?.is_none() {
        return Err(BillingError::NotFound(format!("client {}", new.client_id)));
    }

    let today = Utc::now().date_naive();
    let period = BillingPeriod::of_date(today);
    let number = next_document_number(db, &format!("PAG-{}-", period.compact())).await?;

    let row = payment::ActiveModel {
        payment_number: Set(number),
        client_id: Set(new.client_id),
        declared_amount: Set(new.declared_amount),
        amount_applied: Set(Decimal::ZERO),
        amount_as_credit: Set(Decimal::ZERO),
        status: Set(PaymentStatus::Pending),
        method: Set(new.method),
        receipt_path: Set(new.receipt_path),
        notes: Set(new.notes),
        paid_on: Set(Some(new.paid_on.unwrap_or(today))),
        submitted_on: Set(today),
        processed_on: Set(None),
        processed_by: Set(None),
        rejection_reason: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Approves a pending payment and allocates its funds.
///
/// With `use_credit` the client's available balance is pooled with the
/// payment; credit is consumed before new funds, so only the part of the
/// declared amount that invoices actually absorbed is stored as applied and
/// the rest becomes credit.
#[instrument(skip(db))]
pub async fn approve<C>(
    db: &C,
    payment_id: i32,
    actor: Option<i32>,
    use_credit: bool,
) -> Result<AllocationReport>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let pay = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| BillingError::NotFound(format!("payment {}", payment_id)))?;

    claim_pending(&txn, payment_id, PaymentStatus::Approved, actor, None).await?;

    let credit_available = if use_credit {
        balance::current_balance(&txn, pay.client_id).await?
    } else {
        Decimal::ZERO
    };

    let (applications, total_applied) =
        apply_to_invoices(&txn, pay.client_id, pay.declared_amount + credit_available, payment_id)
            .await?;

    let credit_used = credit_available.min(total_applied);
    let amount_applied = total_applied - credit_used;
    let amount_as_credit = pay.declared_amount - amount_applied;

    if amount_applied + amount_as_credit != pay.declared_amount
        || amount_applied < Decimal::ZERO
        || amount_as_credit < Decimal::ZERO
    {
        return Err(BillingError::AllocationMismatch {
            payment_id,
            declared: pay.declared_amount,
            applied: amount_applied,
            credited: amount_as_credit,
        });
    }

    if credit_used > Decimal::ZERO {
        balance::adjust(
            &txn,
            pay.client_id,
            BalanceChange {
                kind: MovementKind::Debit,
                origin: MovementOrigin::InvoiceApplication,
                amount: credit_used,
                payment_id: Some(payment_id),
                invoice_id: None,
                user_id: actor,
                description: Some(format!("Saldo aplicado junto al pago {}", pay.payment_number)),
            },
        )
        .await?;
    }
    if amount_as_credit > Decimal::ZERO {
        balance::adjust(
            &txn,
            pay.client_id,
            BalanceChange {
                kind: MovementKind::Credit,
                origin: MovementOrigin::PaymentSurplus,
                amount: amount_as_credit,
                payment_id: Some(payment_id),
                invoice_id: None,
                user_id: actor,
                description: Some(format!("Excedente del pago {}", pay.payment_number)),
            },
        )
        .await?;
    }

    let mut totals: payment::ActiveModel = pay.clone().into();
    totals.amount_applied = Set(amount_applied);
    totals.amount_as_credit = Set(amount_as_credit);
    totals.status = Set(PaymentStatus::Approved);
    totals.update(&txn).await?;

    txn.commit().await?;

    info!(
        payment_id,
        applied = %amount_applied,
        credited = %amount_as_credit,
        credit_used = %credit_used,
        invoices = applications.len(),
        "payment approved"
    );

    Ok(AllocationReport {
        payment_id,
        payment_number: pay.payment_number,
        amount_applied,
        amount_as_credit,
        credit_used,
        applications,
    })
}

/// Rejects a pending payment. Nothing else is mutated.
#[instrument(skip(db, reason))]
pub async fn reject<C>(db: &C, payment_id: i32, reason: String, actor: Option<i32>) -> Result<payment::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    if Payment::find_by_id(payment_id).one(&txn).await?.is_none() {
        return Err(BillingError::NotFound(format!("payment {}", payment_id)));
    }
    claim_pending(&txn, payment_id, PaymentStatus::Rejected, actor, Some(reason)).await?;

    let rejected = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| BillingError::NotFound(format!("payment {}", payment_id)))?;
    txn.commit().await?;
    Ok(rejected)
}

/// Spends the client's existing credit against their outstanding invoices.
///
/// Internally a zero-amount payment approved on the spot, so the ledger and
/// the `pago_boletas` trail look the same as for a regular payment.
#[instrument(skip(db))]
pub async fn apply_credit<C>(db: &C, client_id: i32, actor: Option<i32>) -> Result<AllocationReport>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let available = balance::current_balance(&txn, client_id).await?;
    if available <= Decimal::ZERO {
        return Err(BillingError::InsufficientBalance {
            client_id,
            available,
            requested: available,
        });
    }

    let pay = insert_payment(
        &txn,
        NewPayment {
            client_id,
            declared_amount: Decimal::ZERO,
            method: Some("saldo_a_favor".to_string()),
            receipt_path: None,
            notes: Some("Aplicación de saldo a favor".to_string()),
            paid_on: None,
        },
    )
    .await?;

    // Approval runs in a savepoint inside this transaction; if it fails the
    // zero-amount payment is rolled back with it.
    let report = approve(&txn, pay.id, actor, true).await?;
    txn.commit().await?;
    Ok(report)
}

/// Guarded `pendiente -> estado` transition. Zero affected rows on an
/// existing payment means someone got there first.
async fn claim_pending<C>(
    db: &C,
    payment_id: i32,
    to: PaymentStatus,
    actor: Option<i32>,
    rejection_reason: Option<String>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let res = Payment::update_many()
        .col_expr(payment::Column::Status, Expr::value(to))
        .col_expr(payment::Column::ProcessedOn, Expr::value(Utc::now().date_naive()))
        .col_expr(payment::Column::ProcessedBy, Expr::value(actor))
        .col_expr(payment::Column::RejectionReason, Expr::value(rejection_reason))
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(BillingError::AlreadyProcessed { payment_id });
    }
    Ok(())
}

/// Walks the client's outstanding invoices oldest first and absorbs `funds`
/// into them. Returns the per-invoice applications and the total absorbed.
async fn apply_to_invoices<C>(
    db: &C,
    client_id: i32,
    funds: Decimal,
    payment_id: i32,
) -> Result<(Vec<InvoiceApplication>, Decimal)>
where
    C: ConnectionTrait,
{
    let mut remaining = funds;
    let mut applications = Vec::new();
    let today = Utc::now().date_naive();

    for inv in outstanding_for_client(db, client_id).await? {
        if remaining <= Decimal::ZERO {
            break;
        }
        let applied_here = remaining.min(inv.outstanding_balance);
        let settles = applied_here == inv.outstanding_balance;

        payment_invoice::ActiveModel {
            payment_id: Set(payment_id),
            invoice_id: Set(inv.id),
            amount_applied: Set(applied_here),
            settles_invoice: Set(settles),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let mut updated: invoice::ActiveModel = inv.clone().into();
        updated.outstanding_balance = Set(inv.outstanding_balance - applied_here);
        updated.amount_paid = Set(inv.amount_paid + applied_here);
        if settles {
            updated.paid_on = Set(Some(today));
        }
        updated.update(db).await?;

        applications.push(InvoiceApplication {
            invoice_id: inv.id,
            invoice_number: inv.invoice_number,
            amount: applied_here,
            settles_invoice: settles,
        });
        remaining -= applied_here;
    }

    Ok((applications, funds - remaining))
}
