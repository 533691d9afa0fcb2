use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared pause/stop flags the Crawl Loop polls at each iteration
/// boundary (spec §9 design note: model global mutable flags as an
/// atomic control block, not signal handlers inside the loop body). A
/// future dashboard observer would set these from another thread/process
/// attached to the same working directory; today only Ctrl-C sets `stop`.
#[derive(Clone, Default)]
pub struct ControlBlock {
    pause: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ControlBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn set_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[allow(dead_code)]
    pub fn set_pause(&self, paused: bool) {
        self.pause.store(paused, Ordering::Relaxed);
    }

    /// Spawns a task that sets `stop` on the first Ctrl-C, letting the
    /// Crawl Loop exit after its current iteration's commit or rollback.
    pub fn watch_ctrl_c(&self) {
        let control = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after current iteration");
                control.set_stop();
            }
        });
    }
}
