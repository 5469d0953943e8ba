use record_logger::config::LoggerConfig;
use record_logger::init::build_logger;
use record_logger::{fields, Concat, Logger};

fn handle_request(logger: &Logger, article_id: u64) {
    let logger = logger
        .with_fields(fields! { "article_id" => article_id })
        .with_caller(1);
    logger.info(Concat(&[&"loaded article ", &article_id]));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Directory, file name, rotation and time format come from
    // RECORD_LOGGER_* variables when set.
    let mut config = LoggerConfig::from_env()?;
    config.enable_stdout = true;

    let logger = build_logger(&config)?;
    logger.infof(format_args!("{} started", "blog server"));

    for id in 1..=3 {
        handle_request(&logger, id);
    }

    logger.with_fields(fields! { "retry" => 2 }).warn("database slow to respond");
    logger.flush()?;
    Ok(())
}
