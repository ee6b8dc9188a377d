use super::*;
use std::time::Duration;

#[test]
fn deadline_after_zero_is_immediately_expired() {
    let deadline = Deadline::after(Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(5));
    assert!(deadline.is_expired());
}

#[tokio::test]
async fn guard_returns_ok_when_future_finishes_first() {
    let deadline = Deadline::after(Duration::from_millis(200));
    let result = deadline.guard(async { 42 }).await;
    assert_eq!(result, Ok(42));
}

#[tokio::test]
async fn guard_returns_err_when_deadline_expires_first() {
    let deadline = Deadline::after(Duration::from_millis(10));
    let result = deadline
        .guard(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            42
        })
        .await;
    assert_eq!(result, Err(()));
}

#[tokio::test]
async fn initiate_succeeds_immediately_with_no_in_flight_requests() {
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
    assert!(coordinator.initiate().await);
    assert!(coordinator.is_shutdown_initiated());
}

#[tokio::test]
async fn initiate_times_out_if_request_never_completes() {
    let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
    let guard = coordinator.track_request().await;
    let drained = coordinator.initiate().await;
    assert!(!drained);
    drop(guard);
}
