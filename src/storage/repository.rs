use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction as DbTransaction};

use crate::config::StoreConfig;
use crate::domain::{
    Amount, Customer, CustomerId, NewTransaction, Transaction, TransactionKind,
};

use super::MIGRATION_001_INITIAL;

/// An open database transaction. Dropping it without committing rolls it back.
pub type UnitOfWork = DbTransaction<'static, Sqlite>;

/// Result of a checked balance update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// The delta was applied; carries the row as it is after the update
    Applied(Customer),
    /// The resulting balance would have crossed the credit limit
    Rejected,
}

/// Repository for customers and their transaction log.
///
/// Operations that take part in a unit of work receive the open connection
/// explicitly; administrative operations run directly on the pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool using the given settings.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        // WAL lets a read transaction keep a stable snapshot while writers commit.
        let options = SqliteConnectOptions::from_str(&config.database_url())
            .context("Invalid database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .max_lifetime(config.max_lifetime())
            .idle_timeout(config.idle_timeout())
            .acquire_timeout(config.timeout())
            // A read unit of work may be dropped on its deadline with query_only still set
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA query_only = OFF")
                        .execute(&mut *conn)
                        .await?;
                    Ok(true)
                })
            })
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Unit-of-work scope
    // ========================

    /// Begin a read-write unit of work.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so a second writer
    /// waits on the busy timeout instead of failing when it upgrades a read
    /// lock. The checked update in [`Repository::adjust_balance`] is what
    /// keeps concurrent debits from crossing the limit.
    pub async fn begin_write(&self) -> Result<UnitOfWork> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin write transaction")
    }

    /// Begin a read-only unit of work. Under WAL the first read pins a
    /// snapshot that every later read in the same transaction observes.
    /// Writes inside it fail with `SQLITE_READONLY`.
    pub async fn begin_read(&self) -> Result<UnitOfWork> {
        let mut tx = self
            .pool
            .begin_with("BEGIN DEFERRED")
            .await
            .context("Failed to begin read transaction")?;
        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut *tx)
            .await
            .context("Failed to mark read transaction as query-only")?;
        Ok(tx)
    }

    pub async fn commit(&self, tx: UnitOfWork) -> Result<()> {
        tx.commit().await.context("Failed to commit transaction")
    }

    pub async fn rollback(&self, tx: UnitOfWork) -> Result<()> {
        tx.rollback()
            .await
            .context("Failed to roll back transaction")
    }

    // ========================
    // Customer operations
    // ========================

    /// Get a customer by ID.
    pub async fn get_customer(
        &self,
        conn: &mut SqliteConnection,
        id: CustomerId,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, credit_limit, balance
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// Add `delta` to the balance in a single statement, but only if the
    /// result stays at or above `-credit_limit`. Credits match unless the
    /// balance would leave the 64-bit range.
    pub async fn adjust_balance(
        &self,
        conn: &mut SqliteConnection,
        id: CustomerId,
        delta: Amount,
    ) -> Result<Adjustment> {
        let row = sqlx::query(
            r#"
            UPDATE customers
            SET balance = balance + ?
            WHERE id = ?
              AND CASE
                    WHEN ? >= 0 THEN balance <= 9223372036854775807 - ?
                    ELSE balance + ? >= -credit_limit
                  END
            RETURNING id, credit_limit, balance
            "#,
        )
        .bind(delta)
        .bind(id)
        .bind(delta)
        .bind(delta)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to adjust balance")?;

        Ok(match row {
            Some(row) => Adjustment::Applied(Self::row_to_customer(&row)?),
            None => Adjustment::Rejected,
        })
    }

    /// Provision a customer out-of-band. Returns false if the id already exists.
    pub async fn provision_customer(&self, customer: &Customer) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (id, credit_limit, balance)
            VALUES (?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(customer.id)
        .bind(customer.limit)
        .bind(customer.balance)
        .execute(&self.pool)
        .await
        .context("Failed to provision customer")?;

        Ok(result.rows_affected() == 1)
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        Ok(Customer {
            id: row.try_get("id")?,
            limit: row.try_get("credit_limit")?,
            balance: row.try_get("balance").context("Invalid customer balance")?,
        })
    }

    // ========================
    // Transaction log operations
    // ========================

    /// Append an entry to the log. The store assigns `occurred_at`.
    pub async fn append_transaction(
        &self,
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        entry: &NewTransaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (customer_id, value, kind, description)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(customer_id)
        .bind(entry.value)
        .bind(entry.kind.as_code())
        .bind(&entry.description)
        .execute(&mut *conn)
        .await
        .context("Failed to append transaction")?;
        Ok(())
    }

    /// The `limit` most recent entries for a customer, newest first.
    /// Insertion order breaks timestamp ties.
    pub async fn list_recent_transactions(
        &self,
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT value, kind, description, occurred_at
            FROM transactions
            WHERE customer_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(customer_id)
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list recent transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count every log entry for a customer.
    pub async fn count_transactions(&self, customer_id: CustomerId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE customer_id = ?")
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;

        Ok(row.try_get("count")?)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.try_get("kind")?;
        let occurred_at_str: String = row.try_get("occurred_at")?;

        Ok(Transaction {
            value: row.try_get("value")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            description: row.try_get("description")?,
            occurred_at: DateTime::parse_from_rfc3339(&occurred_at_str)
                .context("Invalid occurred_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
