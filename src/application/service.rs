use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::{
    Customer, CustomerId, NewTransaction, STATEMENT_SIZE, Statement, TransactionReceipt,
    TransactionRequest, ValidationError, allows, validate_customer_id,
};
use crate::storage::{Adjustment, Repository};

use super::{AppError, Metrics};

/// Application service applying transactions and reading statements.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// Cloning is cheap: clones share the connection pool and the metrics.
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository, metrics: Arc<Metrics>, timeout: Duration) -> Self {
        Self {
            repo,
            metrics,
            timeout,
        }
    }

    /// Connect to the database and run migrations.
    pub async fn init(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::init(config).await.map_err(|err| {
            error!("opening {} failed: {:#}", config.database, err);
            AppError::from(err)
        })?;
        Ok(Self::new(repo, Arc::new(Metrics::new()), config.timeout()))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(config).await.map_err(|err| {
            error!("connecting to {} failed: {:#}", config.database, err);
            AppError::from(err)
        })?;
        Ok(Self::new(repo, Arc::new(Metrics::new()), config.timeout()))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Provision a customer out-of-band. Returns false if the id was taken.
    pub async fn provision_customer(&self, customer: Customer) -> Result<bool, AppError> {
        customer.validate()?;
        let created = self
            .repo
            .provision_customer(&customer)
            .await
            .map_err(|err| {
                error!("provisioning customer {} failed: {:#}", customer.id, err);
                AppError::from(err)
            })?;
        if created {
            info!(
                "provisioned customer {} (limit {}, balance {})",
                customer.id, customer.limit, customer.balance
            );
        }
        Ok(created)
    }

    // ========================
    // Transaction executor
    // ========================

    /// Apply a credit or debit to a customer's balance under the default deadline.
    pub async fn apply_transaction(
        &self,
        customer_id: CustomerId,
        request: TransactionRequest,
    ) -> Result<TransactionReceipt, AppError> {
        self.apply_transaction_within(customer_id, request, self.timeout)
            .await
    }

    /// Apply a credit or debit, giving up and rolling back after `deadline`.
    pub async fn apply_transaction_within(
        &self,
        customer_id: CustomerId,
        request: TransactionRequest,
        deadline: Duration,
    ) -> Result<TransactionReceipt, AppError> {
        let op = Uuid::new_v4();
        let result = self.try_apply(op, customer_id, request, deadline).await;
        self.metrics.record(&result);
        log_outcome(op, "apply", customer_id, &result);
        result
    }

    async fn try_apply(
        &self,
        op: Uuid,
        customer_id: CustomerId,
        request: TransactionRequest,
        deadline: Duration,
    ) -> Result<TransactionReceipt, AppError> {
        // Malformed input never reaches the store
        validate_customer_id(customer_id)?;
        let entry = request.validate()?;

        let unit_of_work = self.apply_in_unit_of_work(op, customer_id, &entry);
        match tokio::time::timeout(deadline, unit_of_work).await {
            Ok(result) => result,
            // The unit of work was dropped mid-flight, which rolls it back
            Err(_) => Err(AppError::Timeout(deadline)),
        }
    }

    async fn apply_in_unit_of_work(
        &self,
        op: Uuid,
        customer_id: CustomerId,
        entry: &NewTransaction,
    ) -> Result<TransactionReceipt, AppError> {
        let mut tx = self.repo.begin_write().await?;
        debug!(
            "[{}] begin {} {} for customer {}",
            op, entry.kind, entry.value, customer_id
        );

        match self.apply_entry(&mut tx, customer_id, entry).await {
            Ok(updated) => {
                self.repo.commit(tx).await?;
                debug!("[{}] committed, balance now {}", op, updated.balance);
                Ok(updated.into())
            }
            Err(err) => {
                if let Err(rollback_err) = self.repo.rollback(tx).await {
                    warn!("[{}] rollback failed: {:#}", op, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn apply_entry(
        &self,
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        entry: &NewTransaction,
    ) -> Result<Customer, AppError> {
        let customer = self
            .repo
            .get_customer(conn, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("customer {}", customer_id)))?;

        let delta = entry.delta();
        let refusal = |current: &Customer| {
            if delta >= 0 {
                AppError::Validation(ValidationError::BalanceOverflow {
                    balance: current.balance,
                    requested: entry.value,
                })
            } else {
                AppError::InsufficientBalance {
                    customer_id,
                    balance: current.balance,
                    limit: current.limit,
                    requested: entry.value,
                }
            }
        };

        if !allows(customer.balance, customer.limit, delta) {
            return Err(refusal(&customer));
        }

        self.repo.append_transaction(conn, customer_id, entry).await?;

        // The update re-checks the limit against the row it writes
        match self.repo.adjust_balance(conn, customer_id, delta).await? {
            Adjustment::Applied(updated) => Ok(updated),
            Adjustment::Rejected => Err(refusal(&customer)),
        }
    }

    // ========================
    // Statement reader
    // ========================

    /// Read a customer's balance and last transactions from one snapshot.
    pub async fn statement(&self, customer_id: CustomerId) -> Result<Statement, AppError> {
        let op = Uuid::new_v4();
        let unit_of_work = self.read_statement(op, customer_id);
        let result = match tokio::time::timeout(self.timeout, unit_of_work).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.timeout)),
        };
        self.metrics.record(&result);
        log_outcome(op, "statement", customer_id, &result);
        result
    }

    async fn read_statement(
        &self,
        op: Uuid,
        customer_id: CustomerId,
    ) -> Result<Statement, AppError> {
        validate_customer_id(customer_id)?;

        let mut tx = self.repo.begin_read().await?;
        debug!("[{}] begin snapshot for customer {}", op, customer_id);

        let result = self.read_snapshot(&mut tx, customer_id).await;

        // Read-only: always released by rolling back
        if let Err(rollback_err) = self.repo.rollback(tx).await {
            warn!("[{}] rollback failed: {:#}", op, rollback_err);
        }
        result
    }

    async fn read_snapshot(
        &self,
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
    ) -> Result<Statement, AppError> {
        let customer = self
            .repo
            .get_customer(conn, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("customer {}", customer_id)))?;

        let last_transactions = self
            .repo
            .list_recent_transactions(conn, customer_id, STATEMENT_SIZE)
            .await?;

        Ok(Statement::new(&customer, Utc::now(), last_transactions))
    }
}

fn log_outcome<T>(
    op: Uuid,
    operation: &str,
    customer_id: CustomerId,
    result: &Result<T, AppError>,
) {
    let Err(err) = result else {
        info!("[{}] {} for customer {} succeeded", op, operation, customer_id);
        return;
    };

    match err {
        AppError::Internal(source) => error!(
            "[{}] {} for customer {} failed: {:#}",
            op, operation, customer_id, source
        ),
        AppError::Timeout(_) => error!(
            "[{}] {} for customer {} failed: {}",
            op, operation, customer_id, err
        ),
        AppError::Conflict(source) => warn!(
            "[{}] {} for customer {} conflicted: {:#}",
            op, operation, customer_id, source
        ),
        _ => warn!(
            "[{}] {} for customer {} refused: {}",
            op, operation, customer_id, err
        ),
    }
}
