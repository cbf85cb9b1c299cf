//! RequestQueue behavior tests: cooldown, priority order, retry budget

mod helpers;

use async_trait::async_trait;
use helpers::ScriptedModel;
use roam_rec::providers::{
    ModelProvider, ModelRequest, ModelResponse, ProviderError,
};
use roam_rec::queue::{QueueConfig, RequestQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

fn request(user: &str) -> ModelRequest {
    ModelRequest {
        system: "test".to_string(),
        user: user.to_string(),
        max_tokens: 0,
        purpose: "test",
    }
}

fn config(max_in_flight: usize, max_attempts: u32) -> QueueConfig {
    QueueConfig {
        max_in_flight,
        max_attempts,
        backoff_base_ms: 100,
        backoff_cap_ms: 5_000,
        task_timeout: Duration::from_secs(5),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_delays_next_dequeue_until_resume_time() {
    let model = Arc::new(ScriptedModel::with_script_then_ok(
        vec![Err(ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(10)),
        })],
        "{}",
    ));
    let queue = RequestQueue::new(model.clone(), config(1, 3));

    let result = queue.submit(1, request("hello")).await;
    assert!(result.is_ok());

    let times = model.call_times();
    assert_eq!(times.len(), 2);
    // The retry must not dequeue before the provider's retry hint elapsed
    assert!(
        times[1] - times[0] >= Duration::from_secs(10),
        "second call dequeued {:?} after the first, before cooldown expiry",
        times[1] - times[0]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_without_hint_uses_backoff() {
    let model = Arc::new(ScriptedModel::with_script_then_ok(
        vec![Err(ProviderError::RateLimited { retry_after: None })],
        "{}",
    ));
    let queue = RequestQueue::new(model.clone(), config(1, 3));

    queue.submit(1, request("hello")).await.unwrap();

    let times = model.call_times();
    assert_eq!(times.len(), 2);
    // Backoff base is 100ms
    assert!(times[1] - times[0] >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_cooldown() {
    let model = Arc::new(ScriptedModel::with_script_then_ok(
        vec![Err(ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        })],
        "{}",
    ));
    let queue = Arc::new(RequestQueue::new(model.clone(), config(1, 3)));

    let submitter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(1, request("hello")).await })
    };

    // Let the first attempt run and hit the rate limit
    for _ in 0..100 {
        tokio::task::yield_now().await;
        if model.call_count() >= 1 {
            break;
        }
    }
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }

    let status = queue.status();
    assert!(status.cooling_down, "queue should report cooldown");
    assert_eq!(status.queued, 1, "rate-limited task should be requeued");

    // The task still completes once the cooldown expires
    let result = submitter.await.unwrap();
    assert!(result.is_ok());
    assert!(!queue.status().cooling_down);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_task_unaffected_by_cooldown() {
    struct MixedModel {
        gate: tokio::sync::Semaphore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelProvider for MixedModel {
        async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.user.as_str() {
                "slow" => {
                    let _permit = self.gate.acquire().await.unwrap();
                    Ok(ModelResponse {
                        content: "slow-done".to_string(),
                    })
                }
                _ => Err(ProviderError::RateLimited {
                    retry_after: Some(Duration::from_secs(60)),
                }),
            }
        }

        fn provider_id(&self) -> &'static str {
            "model"
        }
    }

    let model = Arc::new(MixedModel {
        gate: tokio::sync::Semaphore::new(0),
        calls: AtomicUsize::new(0),
    });
    let queue = Arc::new(RequestQueue::new(model.clone(), config(2, 1)));

    let slow = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(1, request("slow")).await })
    };
    let limited = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(1, request("limited")).await })
    };

    // Both dispatch (2 slots); the limited one trips the cooldown
    for _ in 0..200 {
        tokio::task::yield_now().await;
        if model.calls.load(Ordering::SeqCst) >= 2 {
            break;
        }
    }
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    assert!(queue.status().cooling_down);

    // The in-flight slow task is not canceled by the cooldown: releasing
    // its gate lets it finish while the queue is still cooling down
    model.gate.add_permits(1);
    let slow_result = slow.await.unwrap().unwrap();
    assert_eq!(slow_result.content, "slow-done");
    assert!(queue.status().cooling_down);

    // Attempt budget of 1: the limited task surfaces its typed error
    let limited_result = limited.await.unwrap();
    assert!(matches!(
        limited_result,
        Err(ProviderError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_priority_then_fifo_dequeue_order() {
    struct GatedModel {
        gate: tokio::sync::Semaphore,
        order: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelProvider for GatedModel {
        async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(request.user.clone());
            if request.user == "blocker" {
                let _permit = self.gate.acquire().await.unwrap();
            }
            Ok(ModelResponse {
                content: "{}".to_string(),
            })
        }

        fn provider_id(&self) -> &'static str {
            "model"
        }
    }

    let model = Arc::new(GatedModel {
        gate: tokio::sync::Semaphore::new(0),
        order: Mutex::new(Vec::new()),
        calls: AtomicUsize::new(0),
    });
    let queue = Arc::new(RequestQueue::new(model.clone(), config(1, 1)));

    // First task occupies the single in-flight slot
    let blocker = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(1, request("blocker")).await })
    };
    while model.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // Enqueued while the queue is saturated: FIFO says low-first, but the
    // urgent task must dequeue first
    let low = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(5, request("low")).await })
    };
    let high = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(0, request("high")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    model.gate.add_permits(1);
    blocker.await.unwrap().unwrap();
    high.await.unwrap().unwrap();
    low.await.unwrap().unwrap();

    let order = model.order.lock().unwrap().clone();
    assert_eq!(order, vec!["blocker", "high", "low"]);
}

#[tokio::test]
async fn test_fifo_within_equal_priority() {
    struct GatedModel {
        gate: tokio::sync::Semaphore,
        order: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelProvider for GatedModel {
        async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(request.user.clone());
            if request.user == "blocker" {
                let _permit = self.gate.acquire().await.unwrap();
            }
            Ok(ModelResponse {
                content: "{}".to_string(),
            })
        }

        fn provider_id(&self) -> &'static str {
            "model"
        }
    }

    let model = Arc::new(GatedModel {
        gate: tokio::sync::Semaphore::new(0),
        order: Mutex::new(Vec::new()),
        calls: AtomicUsize::new(0),
    });
    let queue = Arc::new(RequestQueue::new(model.clone(), config(1, 1)));

    let blocker = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.submit(1, request("blocker")).await })
    };
    while model.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let mut handles = Vec::new();
    for name in ["first", "second", "third"] {
        let queue = queue.clone();
        handles.push(tokio::spawn(
            async move { queue.submit(2, request(name)).await },
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    model.gate.add_permits(1);
    blocker.await.unwrap().unwrap();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let order = model.order.lock().unwrap().clone();
    assert_eq!(order, vec!["blocker", "first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhaustion_surfaces_typed_error() {
    let model = Arc::new(ScriptedModel::always_failing());
    let queue = RequestQueue::new(model.clone(), config(1, 2));

    let result = queue.submit(1, request("hello")).await;
    match result {
        Err(ProviderError::Unavailable { status }) => assert_eq!(status, 503),
        other => panic!("expected Unavailable, got {:?}", other.map(|r| r.content)),
    }
    // Exactly the attempt budget, no more
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let model = Arc::new(ScriptedModel::with_script_then_ok(
        vec![Err(ProviderError::Validation("garbage".to_string()))],
        "{}",
    ));
    let queue = RequestQueue::new(model.clone(), config(1, 3));

    let result = queue.submit(1, request("hello")).await;
    assert!(matches!(result, Err(ProviderError::Validation(_))));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_successful_submit_returns_content() {
    let model = Arc::new(ScriptedModel::with_script_then_ok(vec![], "{\"a\":1}"));
    let queue = RequestQueue::new(model, config(2, 3));

    let response = queue.submit(0, request("hello")).await.unwrap();
    assert_eq!(response.content, "{\"a\":1}");
}
