use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use record_logger::channel_sink::ChannelSink;
use record_logger::memory_sink::{FatalTermination, MemorySink};
use record_logger::{LogSink, Logger};
use tokio::runtime::Handle;
use tokio::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lines_reach_inner_sink_after_flush() {
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), &Handle::current(), 64, 8, Duration::from_secs(60));
    let logger = Logger::new(Arc::new(sink));

    for i in 0..20 {
        logger.infof(format_args!("request {}", i));
    }
    logger.flush().unwrap();

    let events = inner.events();
    assert_eq!(events.len(), 20);
    assert_eq!(events[0]["message"], "request 0");
    assert_eq!(events[19]["message"], "request 19");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn partial_batch_is_written_on_interval() {
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), &Handle::current(), 64, 100, Duration::from_millis(20));

    sink.write_line(r#"{"level":"info"}"#).unwrap();

    let mut waited = Duration::ZERO;
    while inner.is_empty() && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(inner.len(), 1);
    let stats = sink.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.enqueued, 1);
    assert_eq!(stats.dropped, 0);
}

#[test]
fn full_channel_drops_and_counts() {
    // The runtime is never driven, so nothing drains the channel.
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), runtime.handle(), 16, 1, Duration::from_secs(60));

    let results: Vec<_> = (0..20).map(|_| sink.write_line("{}")).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 16);
    let stats = sink.stats();
    assert_eq!(stats.total, 20);
    assert_eq!(stats.enqueued, 16);
    assert_eq!(stats.dropped, 4);
    assert!(inner.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fatal_event_is_drained_before_termination() {
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), &Handle::current(), 64, 100, Duration::from_secs(60));
    let logger = Logger::new(Arc::new(sink));

    logger.info("before");
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        logger.fatal("going down");
    }));

    let payload = outcome.unwrap_err();
    assert!(payload.downcast_ref::<FatalTermination>().is_some());
    let messages: Vec<String> = inner
        .events()
        .iter()
        .map(|e| e["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, ["before", "going down"]);
}

#[test]
fn fatal_line_dropped_on_full_channel_is_written_directly() {
    // Undriven runtime: the 16 earlier lines fill the channel and stay there.
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), runtime.handle(), 16, 1, Duration::from_secs(60));
    let sink = Arc::new(sink.with_flush_timeout(Duration::from_millis(50)));
    let logger = Logger::new(sink.clone());

    for i in 0..16 {
        logger.infof(format_args!("queued {}", i));
    }
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        logger.fatal("going down");
    }));

    assert!(outcome.unwrap_err().downcast_ref::<FatalTermination>().is_some());
    let stats = sink.stats();
    assert_eq!(stats.total, 17);
    assert_eq!(stats.enqueued, 16);
    assert_eq!(stats.dropped, 1);
    let events = inner.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "fatal");
    assert_eq!(events[0]["message"], "going down");
}

#[tokio::test]
async fn fatal_on_current_thread_runtime_does_not_wait_for_drain() {
    // The drain task shares this thread, so it cannot run while `fatal` blocks.
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), &Handle::current(), 64, 100, Duration::from_secs(60));
    let logger = Logger::new(Arc::new(sink.with_flush_timeout(Duration::from_millis(50))));

    let started = std::time::Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        logger.fatal("going down");
    }));

    assert!(outcome.unwrap_err().downcast_ref::<FatalTermination>().is_some());
    assert!(started.elapsed() < Duration::from_secs(2));
    let events = inner.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["message"], "going down");
}

#[test]
fn panic_line_is_written_when_drain_never_runs() {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    let inner = Arc::new(MemorySink::new());
    let (sink, _task) = ChannelSink::new(inner.clone(), runtime.handle(), 16, 1, Duration::from_secs(60));
    let logger = Logger::new(Arc::new(sink.with_flush_timeout(Duration::from_millis(20))));

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        logger.panic("invariant broken");
    }));

    assert!(outcome.is_err());
    let events = inner.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "panic");
}
