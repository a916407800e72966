use chrono::{DateTime, Utc};
use log::*;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{ConsumingAction, NewPayment, Payer, Payment, PaymentId, PaymentStatus, TxRef, UserId, Wei},
    traits::{PaymentLedgerError, PaymentQueryFilter},
};

/// The `payments` table as stored. Amounts and enums are text, and the payer is split over two columns.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub tx_ref: String,
    pub network: String,
    pub amount_wei: String,
    pub recipient: String,
    pub status: String,
    pub purpose: String,
    pub payer_id: Option<String>,
    pub payer_role: Option<String>,
    pub consumed: bool,
    pub consumed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PaymentLedgerError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| PaymentLedgerError::CorruptRecord(format!("payment #{}: {e}", row.id));
        let payer = match (row.payer_id.as_ref(), row.payer_role.as_deref()) {
            (Some(id), Some(role)) => {
                Some(Payer { id: UserId::from(id.as_str()), role: role.parse().map_err(|e| corrupt(format!("{e}")))? })
            },
            (None, None) => None,
            _ => return Err(corrupt("payer id and role must both be set or both be empty".into())),
        };
        let consumed_by = match row.consumed_by.as_deref() {
            Some(action) => Some(action.parse::<ConsumingAction>().map_err(|e| corrupt(e.to_string()))?),
            None => None,
        };
        Ok(Payment {
            id: PaymentId::from(row.id),
            tx_ref: row.tx_ref.parse::<TxRef>().map_err(|e| corrupt(e.to_string()))?,
            amount: Wei::from_wei_str(&row.amount_wei).map_err(|e| corrupt(e.to_string()))?,
            recipient: row.recipient.clone(),
            network: row.network.clone(),
            status: row.status.parse().map_err(|e| corrupt(format!("{e}")))?,
            purpose: row.purpose.parse().map_err(|e| corrupt(format!("{e}")))?,
            payer,
            consumed: row.consumed,
            consumed_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert(row: Option<PaymentRow>) -> Result<Option<Payment>, PaymentLedgerError> {
    row.map(Payment::try_from).transpose()
}

pub async fn insert_verified(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentLedgerError> {
    let tx_ref = payment.tx_ref.clone();
    let now = Utc::now();
    let row: PaymentRow = sqlx::query_as(
        r#"
            INSERT INTO payments (tx_ref, network, amount_wei, recipient, status, purpose, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *;
        "#,
    )
    .bind(payment.tx_ref.as_str())
    .bind(payment.network)
    .bind(payment.amount.to_wei_string())
    .bind(payment.recipient)
    .bind(PaymentStatus::Verified.to_string())
    .bind(payment.purpose.to_string())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => PaymentLedgerError::PaymentAlreadyExists(tx_ref),
        _ => PaymentLedgerError::from(e),
    })?;
    Payment::try_from(row)
}

pub async fn fetch_payment(id: PaymentId, conn: &mut SqliteConnection) -> Result<Option<Payment>, PaymentLedgerError> {
    let row = sqlx::query_as("SELECT * FROM payments WHERE id = ?").bind(id).fetch_optional(conn).await?;
    convert(row)
}

pub async fn fetch_payment_by_tx_ref(
    tx_ref: &TxRef,
    network: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentLedgerError> {
    let row = sqlx::query_as("SELECT * FROM payments WHERE tx_ref = ? AND network = ?")
        .bind(tx_ref.as_str())
        .bind(network)
        .fetch_optional(conn)
        .await?;
    convert(row)
}

/// Sets the payer if none is set yet. Returns `None` if no row was updated, either because the payment does not
/// exist or because it already has a payer.
pub async fn attach_payer_if_unset(
    id: PaymentId,
    payer: &Payer,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentLedgerError> {
    let row = sqlx::query_as(
        r#"
            UPDATE payments SET payer_id = ?, payer_role = ?, updated_at = ?
            WHERE id = ? AND payer_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(payer.id.as_str())
    .bind(payer.role.to_string())
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    convert(row)
}

/// The check-and-set at the heart of the ledger. Consumes the payment only if it is verified, unconsumed, made for the
/// action's purpose and attached to `consumer`, in a single statement. Returns `None` if any condition failed.
pub async fn consume_if_unconsumed(
    id: PaymentId,
    consumer: &UserId,
    action: &ConsumingAction,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentLedgerError> {
    let row = sqlx::query_as(
        r#"
            UPDATE payments SET consumed = 1, consumed_by = ?, updated_at = ?
            WHERE id = ? AND consumed = 0 AND status = 'Verified' AND purpose = ? AND payer_id = ?
            RETURNING *;
        "#,
    )
    .bind(action.to_string())
    .bind(Utc::now())
    .bind(id)
    .bind(action.purpose().to_string())
    .bind(consumer.as_str())
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Conditional consume of payment #{id} by {consumer} matched: {}", row.is_some());
    convert(row)
}

/// As [`consume_if_unconsumed`], also setting the payer if it is unset.
pub async fn attach_and_consume_if_unconsumed(
    id: PaymentId,
    payer: &Payer,
    action: &ConsumingAction,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentLedgerError> {
    let row = sqlx::query_as(
        r#"
            UPDATE payments SET payer_id = ?, payer_role = ?, consumed = 1, consumed_by = ?, updated_at = ?
            WHERE id = ? AND consumed = 0 AND status = 'Verified' AND purpose = ?
                AND (payer_id IS NULL OR payer_id = ?)
            RETURNING *;
        "#,
    )
    .bind(payer.id.as_str())
    .bind(payer.role.to_string())
    .bind(action.to_string())
    .bind(Utc::now())
    .bind(id)
    .bind(action.purpose().to_string())
    .bind(payer.id.as_str())
    .fetch_optional(conn)
    .await?;
    convert(row)
}

pub async fn search_payments(
    filter: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, PaymentLedgerError> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM payments ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(payer) = filter.payer {
        where_clause.push("payer_id = ");
        where_clause.push_bind_unseparated(payer.as_str().to_string());
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(purpose) = filter.purpose {
        where_clause.push("purpose = ");
        where_clause.push_bind_unseparated(purpose.to_string());
    }
    if let Some(consumed) = filter.consumed {
        where_clause.push("consumed = ");
        where_clause.push_bind_unseparated(consumed);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<PaymentRow>().fetch_all(conn).await?;
    rows.into_iter().map(Payment::try_from).collect()
}
