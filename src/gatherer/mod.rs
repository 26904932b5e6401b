//! Listener gathering.
//!
//! The gatherer is split the way a pass flows: the script registry tracks
//! parsed scripts, the fetcher pulls one target's listeners, the correlator
//! joins them with their scripts, the aggregator walks every target in
//! order, and the lifecycle controller ties a pass together.

pub mod aggregator;
pub mod correlator;
pub mod fetcher;
pub mod lifecycle;
pub mod registry;

pub use aggregator::{collect_listeners, enumerate_targets};
pub use correlator::correlate;
pub use fetcher::{ListenerFetcher, TargetListeners};
pub use lifecycle::{EventListenersGatherer, Outcome, PassPhase};
pub use registry::ScriptRegistry;

use crate::driver::Driver;
use crate::error::Result;
use crate::models::Artifact;
use async_trait::async_trait;

/// What a gatherer sees of the pass it is running in.
pub struct PassContext<'a> {
    pub driver: &'a dyn Driver,
    /// Url of the page being loaded.
    pub url: &'a str,
}

impl<'a> PassContext<'a> {
    pub fn new(driver: &'a dyn Driver, url: &'a str) -> Self {
        Self { driver, url }
    }
}

/// A collector bracketing one page load.
#[async_trait]
pub trait Gatherer: Send {
    /// Name the artifact is stored under.
    fn name(&self) -> &'static str;

    /// Called before the page loads. Errors abort the pass.
    async fn before_pass(&mut self, ctx: &PassContext<'_>) -> Result<()>;

    /// Called after the page loaded. Always yields an artifact.
    async fn after_pass(&mut self, ctx: &PassContext<'_>) -> Artifact;
}
