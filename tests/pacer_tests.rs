use std::time::Duration;

use rollcall::engine::Pacer;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn wait_lasts_at_least_the_minimum() {
    let pacer = Pacer::new(1.0, 3.0);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    assert!(pacer.wait(&cancel).await);
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3001), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_a_long_cooldown() {
    let pacer = Pacer::new(10.0, 10.0);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    assert!(!pacer.wait(&cancel).await);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_returns_immediately() {
    let pacer = Pacer::new(5.0, 5.0);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let start = Instant::now();
    assert!(!pacer.wait(&cancel).await);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn zero_range_does_not_sleep() {
    let pacer = Pacer::new(0.0, 0.0);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    assert!(pacer.wait(&cancel).await);
    assert!(start.elapsed() < Duration::from_millis(2));
}
