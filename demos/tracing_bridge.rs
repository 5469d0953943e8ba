use std::sync::Arc;

use record_logger::channel_sink::ChannelSink;
use record_logger::init::init_tracing_bridge;
use record_logger::{Logger, WriterSink};
use tokio::runtime::Handle;
use tokio::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let stdout = Arc::new(WriterSink::stdout());
    let (sink, _task) = ChannelSink::new(stdout, &Handle::current(), 1024, 64, Duration::from_millis(200));
    let logger = Logger::new(Arc::new(sink)).with_callers_frame();

    // Everything emitted through `tracing` now ends up as JSON lines.
    init_tracing_bridge(logger.clone())?;

    info!(port = 8000, "server started");
    error!(order_id = 123, "order failed");
    logger.with_field("component", "demo").debug("direct call");

    logger.flush()?;
    Ok(())
}
