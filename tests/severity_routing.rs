use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Command;
use std::sync::Arc;

use record_logger::memory_sink::MemorySink;
use record_logger::{Level, Logger, WriterSink};

const CHILD_ENV: &str = "RECORD_LOGGER_FATAL_CHILD";

/// Runs only inside the child process spawned by `fatal_terminates_process`.
#[test]
fn fatal_child_process() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }
    let logger = Logger::new(Arc::new(WriterSink::stdout()));
    logger.fatalf(format_args!("cannot bind port {}", 8000));
}

#[test]
fn fatal_terminates_process() {
    let exe = std::env::current_exe().unwrap();
    let output = Command::new(exe)
        .args(["--exact", "fatal_child_process", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        // The harness may print the test name on the same line.
        .filter_map(|line| line.find('{').and_then(|start| serde_json::from_str(&line[start..]).ok()))
        .collect();
    assert_eq!(events.len(), 1, "{}", stdout);
    assert_eq!(events[0]["level"], "fatal");
    assert_eq!(events[0]["message"], "cannot bind port 8000");
    // The harness never got to report the test as finished.
    assert!(!stdout.contains("test result"));
}

#[test]
fn ordinary_levels_return_normally() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink.clone());

    logger.debug("d");
    logger.infof(format_args!("{}", "i"));
    logger.warn("w");
    logger.errorf(format_args!("{}-{}", "e", 1));

    let levels: Vec<String> = sink
        .events()
        .iter()
        .map(|e| e["level"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(levels, ["debug", "info", "warn", "error"]);
}

#[test]
fn panic_is_catchable_after_write() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink.clone());

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        logger.panic("invariant broken");
    }));

    assert!(outcome.is_err());
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.events()[0]["level"], "panic");

    // The logger stays usable after the unwind was intercepted.
    logger.info("recovered");
    assert_eq!(sink.len(), 2);
}

#[test]
fn every_level_emits_without_filtering() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink.clone());

    for level in Level::ALL {
        let _ = catch_unwind(AssertUnwindSafe(|| logger.with_level(level).output("x")));
    }

    let levels: Vec<String> = sink
        .events()
        .iter()
        .map(|e| e["level"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(levels, ["debug", "info", "warn", "error", "fatal", "panic"]);
}

#[test]
fn emitted_line_round_trips() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink.clone());

    logger
        .with_fields(record_logger::fields! {
            "article_id" => 17,
            "tags" => ["go", "rust"],
            "author" => serde_json::json!({ "name": "ana", "admin": false }),
        })
        .info("article published");

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains('\n'));

    let event: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    let obj = event.as_object().unwrap();
    for key in ["level", "time", "message", "callers"] {
        assert!(obj.contains_key(key), "missing {}", key);
    }
    assert_eq!(event["message"], "article published");
    assert_eq!(event["article_id"], 17);
    assert_eq!(event["tags"], serde_json::json!(["go", "rust"]));
    assert_eq!(event["author"]["name"], "ana");
    assert_eq!(event["callers"], serde_json::json!([]));
}
