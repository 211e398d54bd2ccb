//! HotStuff-style comparison engine.
//!
//! The second comparison baseline behind the
//! [`ConsensusEngine`](crate::engine::ConsensusEngine) contract: a view
//! counter advanced by a view-timeout ticker. Quorum certificates and the
//! chained voting rule stay out of scope.

use crate::engine::{ConsensusEngine, EngineError};
use crate::staking::{BlockCtx, CommitteeUpdate};
use crate::ticker::Ticker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default view timeout
pub const DEFAULT_VIEW_TIMEOUT: Duration = Duration::from_millis(1000);

/// HotStuff-style consensus engine.
pub struct HotStuffEngine {
    view_timeout: Duration,
    view: Arc<AtomicU64>,
    ticker: Ticker,
}

impl HotStuffEngine {
    /// Creates a HotStuff engine with the default view timeout.
    pub fn new() -> Self {
        Self {
            view_timeout: DEFAULT_VIEW_TIMEOUT,
            view: Arc::new(AtomicU64::new(0)),
            ticker: Ticker::new(),
        }
    }

    /// The configured view timeout.
    pub fn view_timeout(&self) -> Duration {
        self.view_timeout
    }

    /// The current view number.
    pub fn view(&self) -> u64 {
        self.view.load(Ordering::SeqCst)
    }

    /// Whether the view ticker is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }
}

impl Default for HotStuffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusEngine for HotStuffEngine {
    fn start(&self) -> Result<(), EngineError> {
        let view = Arc::clone(&self.view);
        if !self.ticker.start(self.view_timeout, move || {
            let next = view.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(view = next, "Entering new view");
        }) {
            return Err(EngineError::AlreadyRunning);
        }
        info!("HotStuff engine started");
        Ok(())
    }

    fn stop(&self) {
        if self.ticker.stop() {
            info!("HotStuff engine stopped");
        }
    }

    fn begin_block(&self, _ctx: &BlockCtx) {}

    fn end_block(&self, _ctx: &BlockCtx) -> Vec<CommitteeUpdate> {
        Vec::new()
    }
}
