//! Client credit balance accessor.
//!
//! All balance mutations go through [`adjust`], which writes the new value
//! with a guard on the previously read one and appends a movement row in the
//! same connection (callers run it inside a transaction). The movement table
//! is append-only; [`reconcile`] checks that its sum matches the stored value.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, QueryOrder, Set, SqlErr};
use tracing::{debug, instrument};

use model::entities::balance_movement::{self, MovementKind, MovementOrigin};
use model::entities::client_balance;
use model::entities::prelude::{BalanceMovement, Client, ClientBalance};

use crate::error::{BillingError, Result};

/// A requested change to a client's available balance.
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub kind: MovementKind,
    pub origin: MovementOrigin,
    /// Positive magnitude; the sign is derived from `kind`.
    pub amount: Decimal,
    pub payment_id: Option<i32>,
    pub invoice_id: Option<i32>,
    pub user_id: Option<i32>,
    pub description: Option<String>,
}

/// Result of comparing the stored balance against the movement ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub client_id: i32,
    pub available: Decimal,
    pub movement_sum: Decimal,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.available == self.movement_sum
    }
}

/// Current available balance for a client. Clients without a balance row
/// have zero credit.
pub async fn current_balance<C>(db: &C, client_id: i32) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let row = ClientBalance::find()
        .filter(client_balance::Column::ClientId.eq(client_id))
        .one(db)
        .await?;
    Ok(row.map(|r| r.available).unwrap_or(Decimal::ZERO))
}

/// Applies a single change to the client's balance and appends the audit
/// movement.
///
/// The update is guarded on the value read at the start: if another writer
/// changed the row in between, no rows match and [`BillingError::BalanceConflict`]
/// is returned so the caller can retry. A debit larger than the available
/// balance fails with [`BillingError::InsufficientBalance`] before any write.
#[instrument(skip(db, change), fields(client_id = client_id, amount = %change.amount))]
pub async fn adjust<C>(db: &C, client_id: i32, change: BalanceChange) -> Result<balance_movement::Model>
where
    C: ConnectionTrait,
{
    if change.amount <= Decimal::ZERO {
        return Err(BillingError::InvalidAmount(format!(
            "movement amount must be positive, got {}",
            change.amount
        )));
    }

    let row = ensure_row(db, client_id).await?;
    let before = row.available;
    let delta = match change.kind {
        MovementKind::Credit => change.amount,
        MovementKind::Debit => -change.amount,
    };
    let after = before + delta;

    if after < Decimal::ZERO {
        return Err(BillingError::InsufficientBalance {
            client_id,
            available: before,
            requested: change.amount,
        });
    }

    let res = ClientBalance::update_many()
        .col_expr(client_balance::Column::Available, Expr::value(after))
        .col_expr(client_balance::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(client_balance::Column::ClientId.eq(client_id))
        .filter(client_balance::Column::Available.eq(before))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(BillingError::BalanceConflict { client_id });
    }

    debug!(before = %before, after = %after, "balance updated");

    let movement = balance_movement::ActiveModel {
        client_id: Set(client_id),
        kind: Set(change.kind),
        origin: Set(change.origin),
        amount: Set(delta),
        balance_before: Set(before),
        balance_after: Set(after),
        payment_id: Set(change.payment_id),
        invoice_id: Set(change.invoice_id),
        user_id: Set(change.user_id),
        description: Set(change.description),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(movement.insert(db).await?)
}

/// Movement history for a client, oldest first.
pub async fn history<C>(db: &C, client_id: i32) -> Result<Vec<balance_movement::Model>>
where
    C: ConnectionTrait,
{
    Ok(BalanceMovement::find()
        .filter(balance_movement::Column::ClientId.eq(client_id))
        .order_by_asc(balance_movement::Column::Id)
        .all(db)
        .await?)
}

/// Recomputes the balance from the movement ledger and compares it against
/// the stored value.
pub async fn reconcile<C>(db: &C, client_id: i32) -> Result<ReconcileReport>
where
    C: ConnectionTrait,
{
    let available = current_balance(db, client_id).await?;
    let movements = history(db, client_id).await?;
    let movement_sum = movements.iter().map(|m| m.amount).sum();
    Ok(ReconcileReport {
        client_id,
        available,
        movement_sum,
    })
}

async fn ensure_row<C>(db: &C, client_id: i32) -> Result<client_balance::Model>
where
    C: ConnectionTrait,
{
    if let Some(row) = ClientBalance::find()
        .filter(client_balance::Column::ClientId.eq(client_id))
        .one(db)
        .await?
    {
        return Ok(row);
    }

    if Client::find_by_id(client_id).one(db).await?.is_none() {
        return Err(BillingError::NotFound(format!("client {}", client_id)));
    }

    let fresh = client_balance::ActiveModel {
        client_id: Set(client_id),
        available: Set(Decimal::ZERO),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    match fresh.insert(db).await {
        Ok(row) => Ok(row),
        // Lost the race to another writer; their row is the current one.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            ClientBalance::find()
                .filter(client_balance::Column::ClientId.eq(client_id))
                .one(db)
                .await?
                .ok_or(BillingError::BalanceConflict { client_id })
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn manual_credit(amount: Decimal) -> BalanceChange {
        BalanceChange {
            kind: MovementKind::Credit,
            origin: MovementOrigin::ManualAdjustment,
            amount,
            payment_id: None,
            invoice_id: None,
            user_id: None,
            description: Some("test credit".to_string()),
        }
    }

    fn manual_debit(amount: Decimal) -> BalanceChange {
        BalanceChange {
            kind: MovementKind::Debit,
            origin: MovementOrigin::ManualAdjustment,
            amount,
            ..manual_credit(amount)
        }
    }

    #[tokio::test]
    async fn adjust_creates_row_and_appends_movement() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Juan Soto").await;

        let movement = adjust(&db, client.id, manual_credit(Decimal::new(150000, 2)))
            .await
            .unwrap();
        assert_eq!(movement.balance_before, Decimal::ZERO);
        assert_eq!(movement.balance_after, Decimal::new(150000, 2));
        assert_eq!(movement.amount, Decimal::new(150000, 2));

        assert_eq!(current_balance(&db, client.id).await.unwrap(), Decimal::new(150000, 2));
    }

    #[tokio::test]
    async fn debit_carries_negative_amount_in_ledger() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Ana Rojas").await;

        adjust(&db, client.id, manual_credit(Decimal::new(200000, 2))).await.unwrap();
        let movement = adjust(&db, client.id, manual_debit(Decimal::new(70000, 2)))
            .await
            .unwrap();
        assert_eq!(movement.amount, Decimal::new(-70000, 2));
        assert_eq!(movement.balance_after, Decimal::new(130000, 2));
    }

    #[tokio::test]
    async fn debit_beyond_available_is_rejected_without_writes() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Pedro Lagos").await;
        adjust(&db, client.id, manual_credit(Decimal::new(10000, 2))).await.unwrap();

        let err = adjust(&db, client.id, manual_debit(Decimal::new(15000, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InsufficientBalance { .. }));

        assert_eq!(current_balance(&db, client.id).await.unwrap(), Decimal::new(10000, 2));
        assert_eq!(history(&db, client.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_and_negative_amounts_are_invalid() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Rosa Díaz").await;

        let err = adjust(&db, client.id, manual_credit(Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn unknown_client_is_not_found() {
        let db = testing::setup_db().await.unwrap();
        let err = adjust(&db, 999, manual_credit(Decimal::new(1000, 2))).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
        assert_eq!(current_balance(&db, 999).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn reconcile_matches_ledger_after_mixed_movements() {
        let db = testing::setup_db().await.unwrap();
        let client = testing::seed_client(&db, "Luis Vega").await;

        adjust(&db, client.id, manual_credit(Decimal::new(500000, 2))).await.unwrap();
        adjust(&db, client.id, manual_debit(Decimal::new(120000, 2))).await.unwrap();
        adjust(&db, client.id, manual_credit(Decimal::new(30000, 2))).await.unwrap();

        let report = reconcile(&db, client.id).await.unwrap();
        assert_eq!(report.available, Decimal::new(410000, 2));
        assert_eq!(report.movement_sum, Decimal::new(410000, 2));
        assert!(report.is_consistent());
    }
}
