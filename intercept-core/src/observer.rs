//! Interceptor observers
//!
//! Observers are notified after the interceptor has released its state lock,
//! so they may call back into the interceptor (for example to poll the queue).

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use intercept_common::{Direction, Transaction, TransactionId};

pub trait InterceptorObserver: Send + Sync {
    /// A transaction was placed on hold
    fn transaction_queued(&self, transaction: Arc<dyn Transaction>);

    /// A held transaction was forwarded by a policy change
    fn transaction_released(&self, _transaction: Arc<dyn Transaction>) {}
}

/// Event delivered to asynchronous consumers such as a UI task
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InterceptorEvent {
    Queued {
        id: TransactionId,
        direction: Direction,
    },
    Released {
        id: TransactionId,
        direction: Direction,
    },
}

/// Forwards notifications into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<InterceptorEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<InterceptorEvent>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InterceptorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: InterceptorEvent) {
        if self.sender.send(event).is_err() {
            debug!("Interceptor event receiver dropped");
        }
    }
}

impl InterceptorObserver for ChannelObserver {
    fn transaction_queued(&self, transaction: Arc<dyn Transaction>) {
        self.send(InterceptorEvent::Queued {
            id: transaction.id(),
            direction: transaction.direction(),
        });
    }

    fn transaction_released(&self, transaction: Arc<dyn Transaction>) {
        self.send(InterceptorEvent::Released {
            id: transaction.id(),
            direction: transaction.direction(),
        });
    }
}
