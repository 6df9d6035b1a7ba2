use std::sync::Arc;
use std::time::Duration;

use parrot_core::AsyncQueue;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn fifo_order_preserved() {
    let queue = AsyncQueue::new();
    for i in 0..5 {
        queue.push(i);
    }
    for i in 0..5 {
        assert_eq!(queue.next_item().await, Some(i));
    }
}

#[tokio::test]
async fn next_item_suspends_until_push() {
    let queue = Arc::new(AsyncQueue::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.next_item().await })
    };

    // Give the consumer time to suspend on the empty queue
    sleep(Duration::from_millis(50)).await;
    assert!(!consumer.is_finished(), "consumer should be suspended");

    queue.push("hello");
    let got = timeout(Duration::from_millis(500), consumer)
        .await
        .expect("timeout")
        .expect("join");
    assert_eq!(got, Some("hello"));
}

#[tokio::test]
async fn stop_wakes_waiter_with_none() {
    let queue: Arc<AsyncQueue<u32>> = Arc::new(AsyncQueue::new());
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.next_item().await })
    };

    sleep(Duration::from_millis(50)).await;
    queue.stop();

    let got = timeout(Duration::from_millis(500), consumer)
        .await
        .expect("timeout")
        .expect("join");
    assert_eq!(got, None);
}

#[tokio::test]
async fn stop_discards_pending_items() {
    let queue = AsyncQueue::new();
    queue.push(1);
    queue.push(2);
    queue.push(3);
    queue.stop();
    assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn stop_on_empty_queue_without_waiter_is_noop() {
    let queue = AsyncQueue::new();
    queue.stop();
    assert_eq!(queue.len(), 0);

    // The queue stays usable: a later consumer still waits for a push
    // rather than observing the old stop.
    let queue = Arc::new(queue);
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.next_item().await })
    };
    sleep(Duration::from_millis(50)).await;
    assert!(!consumer.is_finished(), "old stop must not wake new consumer");

    queue.push(42);
    let got = timeout(Duration::from_millis(500), consumer)
        .await
        .expect("timeout")
        .expect("join");
    assert_eq!(got, Some(42));
}

#[tokio::test]
async fn queue_reusable_after_stop() {
    let queue = AsyncQueue::new();
    queue.push("stale");
    queue.stop();
    queue.push("fresh");
    assert_eq!(queue.next_item().await, Some("fresh"));
}

#[tokio::test]
async fn length_tracks_pushes_and_pops() {
    let queue = AsyncQueue::new();
    assert!(queue.is_empty());
    queue.push(1);
    queue.push(2);
    assert_eq!(queue.len(), 2);
    queue.next_item().await;
    assert_eq!(queue.len(), 1);
}
