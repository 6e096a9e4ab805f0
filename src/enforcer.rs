//! Ties transaction writes to budget limit checks.
//!
//! Creating a transaction persists it, resolves the category's limit,
//! recomputes the category's spend and decides whether the user should be
//! alerted, all inside one SQLite transaction while the database lock is held.
//! That makes every enforcement decision serial and atomic with the write it
//! belongs to. The alert itself is delivered on a separate task so a slow or
//! failing notifier never holds up or fails the write.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use axum::extract::FromRef;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    AppState, Error,
    alert::{AlertNotifier, BudgetAlert, NotificationError, send_alert},
    budget_limit::{
        BudgetLimit, clear_breach_notified, get_budget_limit, get_budget_limits,
        mark_breach_notified, upsert_budget_limit,
    },
    category::CategoryName,
    limit_cache::LimitCache,
    transaction::{Transaction, TransactionType, create_transaction, sum_expenses},
    user::{UserID, get_user_by_id},
    validation::{LimitInput, TransactionInput, ValidatedTransaction, validate_limit, validate_transaction},
};

/// How a new transaction left its category's budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Income does not count towards budget limits.
    NotApplicable,
    /// The category has no limit.
    NoLimit,
    /// Spending in the category is below its limit.
    UnderLimit {
        /// The category's limit.
        #[serde(with = "rust_decimal::serde::float")]
        limit: Decimal,
        /// Total expenses in the category, including the new transaction.
        #[serde(with = "rust_decimal::serde::float")]
        spent: Decimal,
    },
    /// Spending in the category has reached its limit.
    OverLimit {
        /// The category's limit.
        #[serde(with = "rust_decimal::serde::float")]
        limit: Decimal,
        /// Total expenses in the category, including the new transaction.
        #[serde(with = "rust_decimal::serde::float")]
        spent: Decimal,
        /// Whether this transaction triggered the alert. Later transactions in
        /// the same breach do not alert again.
        alert_triggered: bool,
    },
}

/// The result of creating a transaction.
#[derive(Debug)]
pub struct EnforcementOutcome {
    /// The persisted transaction.
    pub transaction: Transaction,
    /// The state of the category's budget after the transaction.
    pub budget: BudgetStatus,
    /// The task delivering the alert, if one was triggered.
    ///
    /// Callers do not need to await it, the alert is delivered either way.
    pub alert: Option<JoinHandle<Result<(), NotificationError>>>,
}

/// Creates transactions and budget limits, and alerts users when spending
/// reaches a limit.
#[derive(Clone)]
pub struct BudgetEnforcer {
    db_connection: Arc<Mutex<Connection>>,
    limit_cache: Arc<LimitCache>,
    notifier: Arc<dyn AlertNotifier>,
    notify_timeout: Duration,
}

impl FromRef<AppState> for BudgetEnforcer {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.db_connection.clone(),
            state.limit_cache.clone(),
            state.notifier.clone(),
            state.notify_timeout,
        )
    }
}

impl BudgetEnforcer {
    /// Create an enforcer.
    ///
    /// The database should already be initialized with [crate::initialize_db].
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        limit_cache: Arc<LimitCache>,
        notifier: Arc<dyn AlertNotifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            db_connection,
            limit_cache,
            notifier,
            notify_timeout,
        }
    }

    /// Validate and persist a transaction for `user_id`, then check its budget.
    ///
    /// An alert is sent at most once per breach: the first expense that takes
    /// the category's spend to or over its limit triggers it, and it is
    /// re-armed once spend is seen below the limit again or the limit is
    /// changed.
    ///
    /// The database work runs on the blocking thread pool and finishes even if
    /// the returned future is dropped, so a transaction is never persisted
    /// without its budget check or alert.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if `input` is invalid, in which case nothing is persisted,
    /// - [Error::Unauthorized] if `user_id` does not refer to a registered user,
    /// - or a persistence error ([Error::SqlError], [Error::DatabaseLockError],
    ///   [Error::BlockingTaskFailed]) if the transaction could not be saved.
    ///
    /// Alert delivery errors are logged and never returned.
    pub async fn create_transaction(
        &self,
        user_id: UserID,
        input: TransactionInput,
    ) -> Result<EnforcementOutcome, Error> {
        let transaction = validate_transaction(input, OffsetDateTime::now_utc())?;
        let runtime = Handle::current();

        self.run_blocking(move |enforcer| {
            enforcer.persist_and_enforce(user_id, &transaction, &runtime)
        })
        .await
    }

    /// Set the limit for one of `user_id`'s categories, replacing any existing limit.
    ///
    /// The cache is refreshed before the database lock is released, so the
    /// next transaction checked against this category sees the new limit.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if the category or limit is invalid,
    /// - [Error::Unauthorized] if `user_id` does not refer to a registered user,
    /// - or a persistence error if the limit could not be saved.
    pub async fn set_limit(&self, user_id: UserID, input: LimitInput) -> Result<BudgetLimit, Error> {
        let (category, limit) = validate_limit(input.category.as_ref(), input.limit.as_ref())?;

        self.run_blocking(move |enforcer| {
            let connection = enforcer.lock_connection()?;
            let saved = upsert_budget_limit(user_id, &category, limit, &connection)?;
            enforcer
                .limit_cache
                .set(user_id, saved.category.clone(), saved.limit);

            tracing::debug!(
                "set limit for user {user_id} and category {} to {}",
                saved.category,
                saved.limit
            );

            Ok(saved)
        })
        .await
    }

    /// Get the limit for one of `user_id`'s categories.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if `category` is not a valid category name,
    /// - [Error::NotFound] if no limit has been set for the category,
    /// - or a persistence error if the limit could not be read.
    pub async fn get_limit(&self, user_id: UserID, category: &str) -> Result<BudgetLimit, Error> {
        let category = CategoryName::new(category)?;

        self.run_blocking(move |enforcer| {
            let connection = enforcer.lock_connection()?;

            match enforcer.resolve_limit(user_id, &category, &connection)? {
                Some(limit) => Ok(BudgetLimit {
                    user_id,
                    category,
                    limit,
                }),
                None => Err(Error::NotFound),
            }
        })
        .await
    }

    /// Get all of `user_id`'s limits ordered by category.
    ///
    /// # Errors
    /// Returns a persistence error if the limits could not be read.
    pub async fn get_limits(&self, user_id: UserID) -> Result<Vec<BudgetLimit>, Error> {
        self.run_blocking(move |enforcer| {
            let connection = enforcer.lock_connection()?;
            get_budget_limits(user_id, &connection)
        })
        .await
    }

    fn persist_and_enforce(
        &self,
        user_id: UserID,
        transaction: &ValidatedTransaction,
        runtime: &Handle,
    ) -> Result<EnforcementOutcome, Error> {
        let mut connection = self.lock_connection()?;

        let sql_transaction = connection.transaction()?;
        let transaction = create_transaction(user_id, transaction, &sql_transaction)?;
        let budget = self.evaluate_budget(&transaction, &sql_transaction)?;
        sql_transaction.commit()?;

        let alert = match budget {
            BudgetStatus::OverLimit {
                limit,
                spent,
                alert_triggered: true,
            } => self.dispatch_alert(&transaction, limit, spent, &connection, runtime),
            _ => None,
        };

        Ok(EnforcementOutcome {
            transaction,
            budget,
            alert,
        })
    }

    fn evaluate_budget(
        &self,
        transaction: &Transaction,
        connection: &Connection,
    ) -> Result<BudgetStatus, Error> {
        if transaction.kind == TransactionType::Income {
            return Ok(BudgetStatus::NotApplicable);
        }

        let user_id = transaction.user_id;
        let category = &transaction.category;

        let Some(limit) = self.resolve_limit(user_id, category, connection)? else {
            return Ok(BudgetStatus::NoLimit);
        };

        let spent = sum_expenses(user_id, category, connection)?;

        if spent >= limit {
            let alert_triggered = mark_breach_notified(user_id, category, connection)?;

            Ok(BudgetStatus::OverLimit {
                limit,
                spent,
                alert_triggered,
            })
        } else {
            clear_breach_notified(user_id, category, connection)?;

            Ok(BudgetStatus::UnderLimit { limit, spent })
        }
    }

    /// Look up a limit in the cache, falling back to the database.
    fn resolve_limit(
        &self,
        user_id: UserID,
        category: &CategoryName,
        connection: &Connection,
    ) -> Result<Option<Decimal>, Error> {
        if let Some(limit) = self.limit_cache.get(user_id, category) {
            tracing::debug!("limit cache hit for user {user_id} and category {category}");
            return Ok(Some(limit));
        }

        tracing::debug!("limit cache miss for user {user_id} and category {category}");

        let stored = get_budget_limit(user_id, category, connection)?;

        if let Some(budget_limit) = &stored {
            self.limit_cache
                .set(user_id, budget_limit.category.clone(), budget_limit.limit);
        }

        Ok(stored.map(|budget_limit| budget_limit.limit))
    }

    fn dispatch_alert(
        &self,
        transaction: &Transaction,
        limit: Decimal,
        spent: Decimal,
        connection: &Connection,
        runtime: &Handle,
    ) -> Option<JoinHandle<Result<(), NotificationError>>> {
        let user = match get_user_by_id(transaction.user_id, connection) {
            Ok(user) => user,
            Err(error) => {
                tracing::error!(
                    user_id = %transaction.user_id,
                    category = %transaction.category,
                    %spent,
                    %limit,
                    "could not look up the recipient of a budget alert: {error}"
                );
                return None;
            }
        };

        let alert = BudgetAlert {
            user_id: user.id,
            email: user.email,
            username: user.username,
            category: transaction.category.clone(),
            limit,
            spent,
        };

        Some(runtime.spawn(send_alert(
            self.notifier.clone(),
            alert,
            self.notify_timeout,
        )))
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    async fn run_blocking<T, F>(&self, task: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&BudgetEnforcer) -> Result<T, Error> + Send + 'static,
    {
        let enforcer = self.clone();

        tokio::task::spawn_blocking(move || task(&enforcer))
            .await
            .map_err(|error| {
                tracing::error!("database task failed: {error}");
                Error::BlockingTaskFailed(error.to_string())
            })?
    }
}
