//! End-to-end interception through the model bus
//!
//! A simulated proxy pipeline submits transactions and parks on held ones,
//! while a reviewer task forwards whatever the interceptor queues.

use intercept_core::{
    BreakpointSet, ChannelObserver, Direction, HttpInterceptor, InterceptionLevel,
    InterceptorConfig, InterceptorEvent, MemoryWorkspace, Model, PropertyStore, ProxyTransaction,
    RequestContext, ResponseContext, Transaction, REQUEST_BREAKPOINT_SET, RESPONSE_BREAKPOINT_SET,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const ADMIN_WRITES: &str = r#"{
    "name": "breakpoints.request",
    "mode": "all",
    "conditions": [
        { "type": "method", "method": "POST" },
        { "type": "url_contains", "pattern": "/admin" }
    ]
}"#;

const SERVER_ERRORS: &str = r#"{
    "name": "breakpoints.response",
    "conditions": [
        { "type": "status_code", "status": 500 }
    ]
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Runs one transaction through both directions, waiting whenever it is held.
async fn proxy_roundtrip(
    interceptor: &HttpInterceptor,
    request: RequestContext,
    status: u16,
) -> (bool, bool) {
    let transaction = ProxyTransaction::new(request);

    let request_held = interceptor.submit(transaction.clone());
    if request_held {
        transaction.wait_for_forward().await;
    }

    transaction.set_response(ResponseContext::new(status));
    let response_held = interceptor.submit(transaction.clone());
    if response_held {
        transaction.wait_for_forward().await;
    }
    (request_held, response_held)
}

#[tokio::test]
async fn test_end_to_end_breakpoint_review() {
    init_tracing();

    let model = Model::new();
    let workspace = MemoryWorkspace::shared("engagement");
    workspace.set_integer_property("proxy.interceptor.level.request", 1);
    workspace.set_integer_property("proxy.interceptor.level.response", 1);
    model.open_workspace(workspace.clone());
    model.set_condition_set(
        REQUEST_BREAKPOINT_SET,
        Some(Arc::new(BreakpointSet::from_json(ADMIN_WRITES).unwrap())),
    );
    model.set_condition_set(
        RESPONSE_BREAKPOINT_SET,
        Some(Arc::new(BreakpointSet::from_json(SERVER_ERRORS).unwrap())),
    );

    let (interceptor, _subscriptions) = HttpInterceptor::attach(&model, InterceptorConfig::default());
    let (observer, mut events) = ChannelObserver::channel();
    interceptor.set_observer(Arc::new(observer));

    // Reviewer: forward the head of the queue for every queued event
    let reviewer = {
        let interceptor = interceptor.clone();
        tokio::spawn(async move {
            let mut reviewed = Vec::new();
            while let Some(event) = events.recv().await {
                if let InterceptorEvent::Queued { id, direction } = event {
                    if let Some(held) = interceptor.queue_at(0) {
                        assert_eq!(held.id(), id);
                        held.forward();
                    }
                    reviewed.push(direction);
                }
            }
            reviewed
        })
    };

    let plain = proxy_roundtrip(
        &interceptor,
        RequestContext::new("GET", "https://target.example/index.html"),
        200,
    );
    assert_eq!(
        timeout(Duration::from_secs(2), plain).await.unwrap(),
        (false, false)
    );

    let admin_write = proxy_roundtrip(
        &interceptor,
        RequestContext::new("POST", "https://target.example/admin/users").with_body("name=x"),
        500,
    );
    assert_eq!(
        timeout(Duration::from_secs(2), admin_write).await.unwrap(),
        (true, true)
    );

    assert_eq!(interceptor.queue_size(), 0);
    let stats = interceptor.stats();
    assert_eq!(stats.submitted, 4);
    assert_eq!(stats.held, 2);
    assert_eq!(stats.handled, 2);
    assert_eq!(stats.released_by_sweep, 0);

    // Dropping the observer closes the event channel and ends the reviewer
    interceptor.clear_observer();
    let reviewed = timeout(Duration::from_secs(2), reviewer).await.unwrap().unwrap();
    assert_eq!(reviewed, vec![Direction::Request, Direction::Response]);
}

#[tokio::test]
async fn test_end_to_end_disable_releases_parked_pipeline() {
    init_tracing();

    let model = Model::new();
    model.open_workspace(MemoryWorkspace::shared("engagement"));
    let (interceptor, _subscriptions) = HttpInterceptor::attach(&model, InterceptorConfig::default());
    let (observer, mut events) = ChannelObserver::channel();
    interceptor.set_observer(Arc::new(observer));
    interceptor.set_level(Direction::Request, InterceptionLevel::EnabledAll);

    let mut pipelines = Vec::new();
    for path in ["/a", "/b", "/c"] {
        let interceptor = interceptor.clone();
        let url = format!("https://target.example{}", path);
        pipelines.push(tokio::spawn(async move {
            proxy_roundtrip(&interceptor, RequestContext::new("GET", &url), 200).await
        }));
    }

    for _ in 0..3 {
        let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap();
        assert!(matches!(event, Some(InterceptorEvent::Queued { .. })));
    }
    assert_eq!(interceptor.queue_size(), 3);

    // Nobody reviews; turning interception off has to unblock every pipeline
    interceptor.set_level(Direction::Request, InterceptionLevel::Disabled);
    for pipeline in pipelines {
        let outcome = timeout(Duration::from_secs(2), pipeline).await.unwrap().unwrap();
        assert_eq!(outcome, (true, false));
    }

    for _ in 0..3 {
        let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap();
        assert!(matches!(event, Some(InterceptorEvent::Released { .. })));
    }
    assert_eq!(interceptor.queue_size(), 0);
    assert_eq!(interceptor.stats().released_by_sweep, 3);
}
