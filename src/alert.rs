//! Budget alerts and the seam to whatever delivers them.
//!
//! Deciding that an alert is due is the enforcer's job. Delivering it (email,
//! push, chat) belongs to an [AlertNotifier] implementation supplied by the
//! caller. Delivery problems are logged and never reach the client that
//! created the transaction.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{category::CategoryName, user::UserID};

/// The default time to wait for a notifier before giving up on an alert.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// A message telling a user that their spending reached a budget limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    /// The user whose budget was breached.
    pub user_id: UserID,
    /// Where to send the alert.
    pub email: String,
    /// The name used to greet the user.
    pub username: String,
    /// The category whose limit was reached.
    pub category: CategoryName,
    /// The configured limit.
    #[serde(with = "rust_decimal::serde::float")]
    pub limit: Decimal,
    /// The total spent in the category, including the transaction that triggered the alert.
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
}

impl BudgetAlert {
    /// The subject line for the alert.
    pub fn subject(&self) -> &'static str {
        "Budget Alert"
    }

    /// The body of the alert.
    pub fn message(&self) -> String {
        format!(
            "Hi {}, you've reached your budget limit for {}: you have spent ${:.2} of your ${:.2} limit.",
            self.username, self.category, self.spent, self.limit
        )
    }
}

/// The errors that may occur when delivering an alert.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotificationError {
    /// The notifier tried and failed to deliver the alert.
    #[error("could not deliver the alert: {0}")]
    Failed(String),

    /// The notifier did not finish within the configured timeout.
    #[error("the notifier did not respond within {0:?}")]
    TimedOut(Duration),
}

/// Delivers budget alerts to users.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Send `alert` to `alert.email`.
    async fn notify(&self, alert: &BudgetAlert) -> Result<(), NotificationError>;
}

/// A notifier that writes alerts to the application log.
///
/// Used when no mail transport is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(&self, alert: &BudgetAlert) -> Result<(), NotificationError> {
        tracing::info!(
            to = %alert.email,
            subject = alert.subject(),
            "{}",
            alert.message()
        );

        Ok(())
    }
}

/// Send `alert` with `notifier`, giving up after `timeout`.
///
/// Failures are logged with enough detail to resend the alert by hand and
/// then returned so that callers holding the task handle can inspect them.
pub async fn send_alert(
    notifier: Arc<dyn AlertNotifier>,
    alert: BudgetAlert,
    timeout: Duration,
) -> Result<(), NotificationError> {
    let result = match tokio::time::timeout(timeout, notifier.notify(&alert)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::TimedOut(timeout)),
    };

    match &result {
        Ok(()) => tracing::info!(
            user_id = %alert.user_id,
            category = %alert.category,
            "sent budget alert"
        ),
        Err(error @ NotificationError::TimedOut(_)) => tracing::warn!(
            user_id = %alert.user_id,
            email = %alert.email,
            category = %alert.category,
            spent = %alert.spent,
            limit = %alert.limit,
            "gave up on budget alert: {error}"
        ),
        Err(error) => tracing::error!(
            user_id = %alert.user_id,
            email = %alert.email,
            category = %alert.category,
            spent = %alert.spent,
            limit = %alert.limit,
            "could not send budget alert: {error}"
        ),
    }

    result
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use rust_decimal_macros::dec;

    use crate::{
        alert::{BudgetAlert, LogNotifier, NotificationError, send_alert},
        category::CategoryName,
        test_utils::{FailingNotifier, RecordingNotifier, SlowNotifier},
        user::UserID,
    };

    fn test_alert() -> BudgetAlert {
        BudgetAlert {
            user_id: UserID::new(1),
            email: "jo@example.com".to_owned(),
            username: "jo".to_owned(),
            category: CategoryName::new("dining").unwrap(),
            limit: dec!(50),
            spent: dec!(55),
        }
    }

    #[test]
    fn message_greets_user_and_names_category() {
        let message = test_alert().message();

        assert_eq!(
            message,
            "Hi jo, you've reached your budget limit for dining: you have spent $55.00 of your $50.00 limit."
        );
    }

    #[tokio::test]
    async fn send_alert_delivers_to_notifier() {
        let notifier = Arc::new(RecordingNotifier::default());

        let result = send_alert(notifier.clone(), test_alert(), Duration::from_secs(1)).await;

        assert_eq!(result, Ok(()));
        assert_eq!(notifier.alerts(), vec![test_alert()]);
    }

    #[tokio::test]
    async fn log_notifier_succeeds() {
        let result = send_alert(Arc::new(LogNotifier), test_alert(), Duration::from_secs(1)).await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn send_alert_returns_notifier_error() {
        let result = send_alert(
            Arc::new(FailingNotifier),
            test_alert(),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(NotificationError::Failed(_))));
    }

    #[tokio::test]
    async fn send_alert_times_out() {
        let timeout = Duration::from_millis(10);

        let result = send_alert(
            Arc::new(SlowNotifier(Duration::from_secs(5))),
            test_alert(),
            timeout,
        )
        .await;

        assert_eq!(result, Err(NotificationError::TimedOut(timeout)));
    }
}
