use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use xiaoi::transport::mock::{MockReply, MockTransport};
use xiaoi::{DeliveryError, DispatchError, Dispatcher, Message, Parameters, Shutdown};

fn params(workers: usize, capacity: usize) -> Parameters {
    Parameters {
        workers,
        queue_capacity: capacity,
        endpoint: "http://127.0.0.1:9/ask.do".to_string(),
        ..Parameters::new("key", "secret")
    }
}

/// Open a dispatcher whose callback forwards every message to a channel.
fn open(
    workers: usize,
    capacity: usize,
    transport: Arc<MockTransport>,
) -> (Dispatcher, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::open_with(
        params(workers, capacity),
        transport,
        Arc::new(move |msg: Message| {
            let _ = tx.send(msg);
        }),
    )
    .unwrap();
    (dispatcher, rx)
}

async fn collect(rx: &mut mpsc::UnboundedReceiver<Message>, n: usize) -> Vec<Message> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("callback not invoked in time")
            .expect("callback channel closed");
        out.push(msg);
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn three_posts_all_answered() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let (dispatcher, mut rx) = open(2, 10, Arc::clone(&mock));

    let ids: Vec<u64> = ["a", "b", "c"]
        .iter()
        .map(|q| dispatcher.post("Test1", q).unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let messages = collect(&mut rx, 3).await;
    assert!(messages.iter().all(|m| m.answer == "ok" && m.failure.is_none()));
    let seen: HashSet<u64> = messages.iter().map(|m| m.id).collect();
    assert_eq!(seen, HashSet::from([1, 2, 3]));
    assert_eq!(mock.requests().len(), 3);

    assert_eq!(
        dispatcher.close(Duration::from_secs(1)).await.unwrap(),
        Shutdown::Clean
    );
}

#[tokio::test]
async fn server_error_yields_empty_answer() {
    let mock = Arc::new(MockTransport::always(MockReply::status(500)));
    let (dispatcher, mut rx) = open(1, 4, mock);

    let id = dispatcher.post("u", "will fail").unwrap();
    let msg = collect(&mut rx, 1).await.remove(0);

    assert_eq!(msg.id, id);
    assert_eq!(msg.answer, "");
    assert_eq!(msg.failure, Some(DeliveryError::Status(500)));

    dispatcher.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn callback_fires_once_per_message_mixed_outcomes() {
    let mock = Arc::new(MockTransport::scripted(
        vec![
            MockReply::ok("one"),
            MockReply::status(502),
            MockReply::error(DeliveryError::Transport("reset".into())),
            MockReply::error(DeliveryError::Read("truncated".into())),
        ],
        MockReply::ok("rest"),
    ));
    let (dispatcher, mut rx) = open(3, 50, mock);

    for i in 0..20 {
        dispatcher.post("u", &format!("q{i}")).unwrap();
    }

    let messages = collect(&mut rx, 20).await;
    let ids: HashSet<u64> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, (1..=20).collect::<HashSet<u64>>());
    assert_eq!(messages.iter().filter(|m| m.failure.is_some()).count(), 3);
    assert!(
        messages
            .iter()
            .filter(|m| m.failure.is_some())
            .all(|m| m.answer.is_empty())
    );

    // Nothing beyond the 20 expected callbacks.
    dispatcher.close(Duration::from_secs(1)).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ids_strictly_increase_from_one() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let (dispatcher, mut rx) = open(2, 100, mock);

    let ids: Vec<u64> = (0..50)
        .map(|i| dispatcher.post("u", &format!("q{i}")).unwrap())
        .collect();
    assert_eq!(ids, (1..=50).collect::<Vec<u64>>());

    collect(&mut rx, 50).await;
    dispatcher.close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn admission_rejects_when_near_capacity() {
    // The single worker parks on the first message, so the rest stay queued.
    let mock = Arc::new(MockTransport::always(
        MockReply::ok("late").after(Duration::from_secs(30)),
    ));
    let (dispatcher, _rx) = open(1, 3, mock);

    dispatcher.post("u", "first").unwrap();
    // Let the worker take the first message.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(dispatcher.pending(), 0);

    // occupancy 0, 1, 2 pass the check (2 + 1 == 3)
    for _ in 0..3 {
        dispatcher.post("u", "queued").unwrap();
    }
    assert_eq!(dispatcher.pending(), 3);

    assert_eq!(dispatcher.post("u", "overflow"), Err(DispatchError::QueueFull));
    assert_eq!(dispatcher.pending(), 3);

    let shutdown = dispatcher.close(Duration::from_millis(100)).await.unwrap();
    assert_eq!(shutdown, Shutdown::TimedOut { remaining: 1 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_is_bounded_by_timeout() {
    let mock = Arc::new(MockTransport::always(
        MockReply::ok("slow").after(Duration::from_secs(5)),
    ));
    let (dispatcher, _rx) = open(1, 4, mock);

    dispatcher.post("u", "slow question").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let shutdown = dispatcher.close(Duration::from_secs(1)).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(shutdown, Shutdown::TimedOut { remaining: 1 });
    assert!(elapsed >= Duration::from_millis(900), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "close blocked for {elapsed:?}");
}

#[tokio::test]
async fn close_does_not_drain_queue() {
    let mock = Arc::new(MockTransport::always(
        MockReply::ok("ok").after(Duration::from_millis(200)),
    ));
    let (dispatcher, mut rx) = open(1, 10, Arc::clone(&mock));

    for i in 0..5 {
        dispatcher.post("u", &format!("q{i}")).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The in-flight call finishes, the queued ones are left behind.
    let shutdown = dispatcher.close(Duration::from_secs(2)).await.unwrap();
    assert_eq!(shutdown, Shutdown::Clean);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(first.answer, "ok");
    assert!(rx.try_recv().is_err());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn post_after_close_is_rejected() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let (dispatcher, _rx) = open(2, 10, mock);

    dispatcher.close(Duration::from_secs(1)).await.unwrap();
    assert_eq!(dispatcher.post("u", "q"), Err(DispatchError::Closed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn post_concurrent_with_close_never_panics() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let (dispatcher, _rx) = open(2, 1000, mock);
    let dispatcher = Arc::new(dispatcher);

    let poster = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let mut outcomes = Vec::new();
            for i in 0..200 {
                outcomes.push(dispatcher.post("u", &format!("q{i}")));
                tokio::task::yield_now().await;
            }
            outcomes
        })
    };

    tokio::time::sleep(Duration::from_millis(1)).await;
    dispatcher.close(Duration::from_secs(1)).await.unwrap();

    let outcomes = poster.await.unwrap();
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, Ok(_) | Err(DispatchError::Closed)))
    );
}

#[tokio::test]
async fn panicking_callback_does_not_block_close() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let dispatcher = Dispatcher::open_with(
        params(1, 4),
        mock,
        Arc::new(|_: Message| panic!("callback exploded")),
    )
    .unwrap();

    dispatcher.post("u", "q").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    dispatcher.post("u", "q").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let shutdown = dispatcher.close(Duration::from_secs(2)).await.unwrap();
    assert_eq!(shutdown, Shutdown::Clean);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn worker_survives_panicking_callback() {
    let mock = Arc::new(MockTransport::always(MockReply::ok("ok")));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::open_with(
        params(1, 4),
        mock,
        Arc::new(move |msg: Message| {
            if msg.id == 1 {
                panic!("callback exploded on first message");
            }
            let _ = tx.send(msg);
        }),
    )
    .unwrap();

    assert_eq!(dispatcher.post("u", "q1"), Ok(1));
    assert_eq!(dispatcher.post("u", "q2"), Ok(2));

    let second = collect(&mut rx, 1).await.remove(0);
    assert_eq!(second.id, 2);
    assert_eq!(second.answer, "ok");
    assert_eq!(dispatcher.pending(), 0);

    assert_eq!(
        dispatcher.close(Duration::from_secs(1)).await.unwrap(),
        Shutdown::Clean
    );
}
