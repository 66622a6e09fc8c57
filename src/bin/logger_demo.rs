use usher::logger::*;
use usher::settings::Log;

fn main() -> anyhow::Result<()> {
    let logger = Logger::bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let log = Log {
        filter: "debug".to_string(),
    };
    logger.apply(&log)?;
    trace!("application trace log");
    debug!("application debug log");
    info!("application info log");

    Ok(())
}
