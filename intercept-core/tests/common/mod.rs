#![allow(dead_code)]

use intercept_core::{
    BreakpointCondition, BreakpointSet, BreakpointSetDefinition, ConditionSet, HttpInterceptor,
    InterceptorConfig, InterceptorObserver, MatchMode, PendingError, PendingOwner, RequestContext,
    ResponseContext, Transaction, TransactionId,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Shared log of forward() calls, in call order
pub type ForwardLog = Arc<Mutex<Vec<TransactionId>>>;

/// Transaction that records forwards instead of resuming a pipeline
#[derive(Debug)]
pub struct RecordingTransaction {
    id: TransactionId,
    request: Arc<RequestContext>,
    response: Option<Arc<ResponseContext>>,
    pending: Mutex<bool>,
    log: ForwardLog,
}

impl RecordingTransaction {
    pub fn new_request(method: &str, log: &ForwardLog) -> Arc<Self> {
        Arc::new(Self {
            id: TransactionId::new(),
            request: Arc::new(RequestContext::new(method, "http://target.example/api")),
            response: None,
            pending: Mutex::new(false),
            log: log.clone(),
        })
    }

    pub fn new_response(method: &str, status: u16, log: &ForwardLog) -> Arc<Self> {
        Arc::new(Self {
            id: TransactionId::new(),
            request: Arc::new(RequestContext::new(method, "http://target.example/api")),
            response: Some(Arc::new(ResponseContext::new(status))),
            pending: Mutex::new(false),
            log: log.clone(),
        })
    }
}

impl Transaction for RecordingTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn has_response(&self) -> bool {
        self.response.is_some()
    }

    fn request(&self) -> Arc<RequestContext> {
        self.request.clone()
    }

    fn response(&self) -> Option<Arc<ResponseContext>> {
        self.response.clone()
    }

    fn mark_pending(&self, _owner: Weak<dyn PendingOwner>) -> Result<(), PendingError> {
        let mut pending = self.pending.lock();
        if *pending {
            return Err(PendingError::AlreadyPending { id: self.id });
        }
        *pending = true;
        Ok(())
    }

    fn forward(&self) {
        *self.pending.lock() = false;
        self.log.lock().push(self.id);
    }
}

/// Observer that records queued and released ids
#[derive(Default)]
pub struct RecordingObserver {
    pub queued: Mutex<Vec<TransactionId>>,
    pub released: Mutex<Vec<TransactionId>>,
}

impl InterceptorObserver for RecordingObserver {
    fn transaction_queued(&self, transaction: Arc<dyn Transaction>) {
        self.queued.lock().push(transaction.id());
    }

    fn transaction_released(&self, transaction: Arc<dyn Transaction>) {
        self.released.lock().push(transaction.id());
    }
}

pub fn new_log() -> ForwardLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn observed_interceptor() -> (HttpInterceptor, Arc<RecordingObserver>) {
    let interceptor = HttpInterceptor::new(InterceptorConfig::default());
    let observer = Arc::new(RecordingObserver::default());
    interceptor.set_observer(observer.clone());
    (interceptor, observer)
}

pub fn method_set(name: &str, method: &str) -> Arc<dyn ConditionSet> {
    Arc::new(
        BreakpointSet::new(BreakpointSetDefinition {
            name: name.to_string(),
            mode: MatchMode::All,
            conditions: vec![BreakpointCondition::Method {
                method: method.to_string(),
            }],
        })
        .unwrap(),
    )
}
