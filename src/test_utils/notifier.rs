use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::alert::{AlertNotifier, BudgetAlert, NotificationError};

/// Keeps every alert it is asked to send.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<BudgetAlert>>,
}

impl RecordingNotifier {
    pub(crate) fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn alerts(&self) -> Vec<BudgetAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(&self, alert: &BudgetAlert) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Fails every delivery.
#[derive(Debug, Default)]
pub(crate) struct FailingNotifier;

#[async_trait]
impl AlertNotifier for FailingNotifier {
    async fn notify(&self, _alert: &BudgetAlert) -> Result<(), NotificationError> {
        Err(NotificationError::Failed("SMTP server unavailable".to_owned()))
    }
}

/// Takes the given time to deliver each alert.
#[derive(Debug)]
pub(crate) struct SlowNotifier(pub Duration);

#[async_trait]
impl AlertNotifier for SlowNotifier {
    async fn notify(&self, _alert: &BudgetAlert) -> Result<(), NotificationError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}
