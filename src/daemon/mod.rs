pub mod relay;

use anyhow::Result;
use log::{error, info};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::daemon::relay::Relay;

pub struct DaemonConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Run a single iteration and return its result.
    pub once: bool,
}

/// Flag cleared by Ctrl-C. Call once per process.
pub fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

pub fn run_daemon(relay: &mut Relay<'_>, cfg: DaemonConfig, running: &AtomicBool) -> Result<()> {
    info!("relay started, update offset {:?}", relay.offset());
    let mut backoff = cfg.initial_backoff;

    while running.load(Ordering::SeqCst) {
        match relay.run_once() {
            Ok(()) => backoff = cfg.initial_backoff,
            Err(e) if cfg.once => return Err(e),
            Err(e) => {
                error!("relay iteration failed, retrying in {backoff:?}: {e:#}");
                thread::sleep(backoff);
                backoff = next_backoff(backoff, cfg.max_backoff);
            }
        }
        if cfg.once {
            break;
        }
    }

    info!("relay stopped");
    Ok(())
}
