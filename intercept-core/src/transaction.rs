//! Proxy-side transaction with a pause/resume signal
//!
//! The proxy pipeline submits a [`ProxyTransaction`] to the interceptor and,
//! if it was held, parks on [`ProxyTransaction::wait_for_forward`] until a
//! human or a policy change forwards it.

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::debug;

use intercept_common::{
    PendingError, PendingOwner, RequestContext, ResponseContext, Transaction, TransactionId,
};

#[derive(Default)]
struct HoldState {
    owner: Option<Weak<dyn PendingOwner>>,
    release_tx: Option<oneshot::Sender<()>>,
    release_rx: Option<oneshot::Receiver<()>>,
}

pub struct ProxyTransaction {
    id: TransactionId,
    request: Arc<RequestContext>,
    response: RwLock<Option<Arc<ResponseContext>>>,
    hold: Mutex<HoldState>,
}

impl ProxyTransaction {
    pub fn new(request: RequestContext) -> Arc<Self> {
        Arc::new(Self {
            id: TransactionId::new(),
            request: Arc::new(request),
            response: RwLock::new(None),
            hold: Mutex::new(HoldState::default()),
        })
    }

    /// Attach the response; the next decision uses the response policy.
    pub fn set_response(&self, response: ResponseContext) {
        *self.response.write() = Some(Arc::new(response));
    }

    pub fn is_pending(&self) -> bool {
        self.hold.lock().owner.is_some()
    }

    /// Wait until the current hold is forwarded.
    ///
    /// Returns immediately if the transaction is not held or the release
    /// signal was already consumed.
    pub async fn wait_for_forward(&self) {
        let rx = self.hold.lock().release_rx.take();
        if let Some(rx) = rx {
            // A dropped sender also means the hold is gone
            let _ = rx.await;
        }
    }
}

impl std::fmt::Debug for ProxyTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyTransaction")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .field("has_response", &self.has_response())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl Transaction for ProxyTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn has_response(&self) -> bool {
        self.response.read().is_some()
    }

    fn request(&self) -> Arc<RequestContext> {
        self.request.clone()
    }

    fn response(&self) -> Option<Arc<ResponseContext>> {
        self.response.read().clone()
    }

    fn mark_pending(&self, owner: Weak<dyn PendingOwner>) -> Result<(), PendingError> {
        let mut hold = self.hold.lock();
        if hold.owner.is_some() {
            return Err(PendingError::AlreadyPending { id: self.id });
        }
        let (tx, rx) = oneshot::channel();
        hold.owner = Some(owner);
        hold.release_tx = Some(tx);
        hold.release_rx = Some(rx);
        Ok(())
    }

    /// Idempotent: only the first call per hold has any effect.
    ///
    /// The owner drops the transaction from its queue before the hold is
    /// cleared, so it cannot be held again while still queued.
    fn forward(&self) {
        let (tx, owner) = {
            let mut hold = self.hold.lock();
            (hold.release_tx.take(), hold.owner.clone())
        };

        let Some(tx) = tx else {
            debug!("Transaction {} forwarded while not held, ignoring", self.id);
            return;
        };

        if let Some(owner) = owner.and_then(|o| o.upgrade()) {
            owner.notify_handled(self.id);
        }

        self.hold.lock().owner = None;
        let _ = tx.send(());
    }
}
