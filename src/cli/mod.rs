use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::application::{AppError, LedgerService};
use crate::config::StoreConfig;
use crate::domain::{Amount, Customer, CustomerId, TransactionRequest};

/// Customers provisioned by `init --seed`: (id, limit).
pub const STANDARD_CUSTOMERS: [(CustomerId, Amount); 5] = [
    (1, 100_000),
    (2, 80_000),
    (3, 1_000_000),
    (4, 10_000_000),
    (5, 500_000),
];

/// Tally - credit-limited customer ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "A customer ledger that applies debits and credits within a credit limit")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print request counters to stderr before exiting
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Provision the standard set of customers
        #[arg(long)]
        seed: bool,
    },

    /// Provision a customer
    Provision {
        /// Customer ID (positive integer)
        id: CustomerId,

        /// Overdraft limit
        #[arg(short, long)]
        limit: Amount,

        /// Opening balance
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        balance: Amount,
    },

    /// Apply a credit or debit to a customer
    Transact {
        /// Customer ID
        id: CustomerId,

        /// Amount, a positive integer
        #[arg(allow_negative_numbers = true)]
        value: i64,

        /// credit (c) or debit (d)
        kind: String,

        /// Up to 10 alphanumeric characters
        description: String,
    },

    /// Show balance and the last transactions of a customer
    Statement {
        /// Customer ID
        id: CustomerId,
    },
}

impl Cli {
    /// Set up `env_logger`. `RUST_LOG` wins over `--verbose`.
    pub fn init_logging(&self) {
        let default_level = if self.verbose { "debug" } else { "warn" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .init();
    }

    pub async fn run(self) -> Result<()> {
        let service = match self.command {
            Commands::Init { .. } => LedgerService::init(&self.store).await.map_err(opaque)?,
            _ => LedgerService::connect(&self.store).await.map_err(opaque)?,
        };

        let outcome = self.dispatch(&service).await;

        if self.metrics {
            let snapshot = service.metrics().snapshot();
            eprintln!("{}", serde_json::to_string(&snapshot)?);
        }
        service.repository().close().await;
        outcome
    }

    async fn dispatch(&self, service: &LedgerService) -> Result<()> {
        match &self.command {
            Commands::Init { seed } => {
                println!("Database initialized: {}", self.store.database);
                if *seed {
                    let created = seed_customers(service).await?;
                    println!("Provisioned {} customers", created);
                }
            }

            Commands::Provision { id, limit, balance } => {
                let customer = Customer::new(*id, *limit, *balance);
                if service.provision_customer(customer).await.map_err(opaque)? {
                    println!("Provisioned customer {}", id);
                } else {
                    println!("Customer {} already exists", id);
                }
            }

            Commands::Transact {
                id,
                value,
                kind,
                description,
            } => {
                let request = TransactionRequest::new(*value, kind.as_str(), description.as_str());
                let receipt = service
                    .apply_transaction(*id, request)
                    .await
                    .map_err(opaque)
                    .with_context(|| format!("Transaction for customer {} failed", id))?;
                self.print_json(&receipt)?;
            }

            Commands::Statement { id } => {
                let statement = service
                    .statement(*id)
                    .await
                    .map_err(opaque)
                    .with_context(|| format!("Statement for customer {} failed", id))?;
                self.print_json(&statement)?;
            }
        }
        Ok(())
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", json);
        Ok(())
    }
}

/// Provision every standard customer that does not exist yet.
pub async fn seed_customers(service: &LedgerService) -> Result<usize> {
    let mut created = 0;
    for (id, limit) in STANDARD_CUSTOMERS {
        let customer = Customer::new(id, limit, 0);
        if service.provision_customer(customer).await.map_err(opaque)? {
            created += 1;
        }
    }
    Ok(created)
}

/// Keep only the error's own message. The service has already logged the
/// storage detail behind it.
fn opaque(err: AppError) -> anyhow::Error {
    anyhow::anyhow!("{}", err)
}
