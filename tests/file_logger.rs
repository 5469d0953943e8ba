#![cfg(feature = "rolling-file")]

use std::fs;
use std::path::Path;
use std::thread;

use record_logger::config::{FileSinkConfig, LoggerConfig, RotationKind};
use record_logger::init::build_logger;
use record_logger::{fields, TimeFormat};

fn read_events(dir: &Path) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        for line in content.lines() {
            events.push(serde_json::from_str(line).unwrap());
        }
    }
    events
}

fn config(dir: &Path) -> LoggerConfig {
    LoggerConfig {
        file: Some(FileSinkConfig {
            save_path: dir.to_path_buf(),
            file_name: "blog".to_string(),
            file_ext: ".log".to_string(),
            rotation: RotationKind::Never,
            max_log_files: 10,
        }),
        ..LoggerConfig::default()
    }
}

#[test]
fn root_logger_writes_json_lines_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_logger(&config(dir.path())).unwrap();

    root.with_fields(fields! { "path" => "/api/v1/tags" })
        .infof(format_args!("{} handled", "GET"));
    root.error("db unreachable");
    root.flush().unwrap();

    let events = read_events(dir.path());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["message"], "GET handled");
    assert_eq!(events[0]["path"], "/api/v1/tags");
    assert!(events[0]["time"].is_i64());
    assert!(!events[0]["callers"].as_array().unwrap().is_empty());
    assert_eq!(events[1]["level"], "error");
}

#[test]
fn rfc3339_time_format_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_logger(&LoggerConfig {
        time_format: TimeFormat::Rfc3339,
        capture_callers: false,
        ..config(dir.path())
    })
    .unwrap();

    root.warn("slow query");
    root.flush().unwrap();

    let events = read_events(dir.path());
    let time = events[0]["time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
    assert_eq!(events[0]["callers"], serde_json::json!([]));
}

#[test]
fn concurrent_writers_produce_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let root = build_logger(&LoggerConfig {
        capture_callers: false,
        ..config(dir.path())
    })
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let logger = root.with_fields(fields! { "worker" => worker });
            thread::spawn(move || {
                for i in 0..100 {
                    logger.with_fields(fields! { "i" => i }).info("tick");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    root.flush().unwrap();

    let events = read_events(dir.path());
    assert_eq!(events.len(), 800);
    for worker in 0..8 {
        let count = events.iter().filter(|e| e["worker"] == worker).count();
        assert_eq!(count, 100);
    }
}
