//! Pass lifecycle for the event listener gatherer.
//!
//! `before_pass` starts script tracking. `after_pass` stops it, enumerates
//! targets, aggregates their listeners, and commits the artifact. Everything
//! after tracking starts runs inside one error boundary: any failure there
//! commits the failure sentinel instead of a partial list.

use crate::config::GathererConfig;
use crate::driver::Driver;
use crate::error::{GatherError, Result};
use crate::gatherer::aggregator::{collect_listeners, enumerate_targets};
use crate::gatherer::fetcher::ListenerFetcher;
use crate::gatherer::registry::ScriptRegistry;
use crate::gatherer::{Gatherer, PassContext};
use crate::models::{Artifact, CorrelatedListener};
use async_trait::async_trait;
use std::mem;
use tracing::{info, warn};

/// How a committed pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Observable phase of the gatherer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPhase {
    Idle,
    Tracking,
    Fetching,
    Committed(Outcome),
}

enum PassState {
    Idle,
    Tracking(ScriptRegistry),
    Fetching,
    Committed(Outcome),
}

/// Collects the event listeners of a page, annotated with their source.
pub struct EventListenersGatherer {
    config: GathererConfig,
    state: PassState,
    artifact: Option<Artifact>,
}

impl EventListenersGatherer {
    pub fn new(config: GathererConfig) -> Self {
        Self {
            config,
            state: PassState::Idle,
            artifact: None,
        }
    }

    pub fn phase(&self) -> PassPhase {
        match &self.state {
            PassState::Idle => PassPhase::Idle,
            PassState::Tracking(_) => PassPhase::Tracking,
            PassState::Fetching => PassPhase::Fetching,
            PassState::Committed(outcome) => PassPhase::Committed(*outcome),
        }
    }

    /// The artifact of the last committed pass.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    async fn start(&mut self, driver: &dyn Driver) -> Result<()> {
        if matches!(self.state, PassState::Tracking(_) | PassState::Fetching) {
            return Err(GatherError::AlreadyTracking);
        }

        self.artifact = None;
        self.state = PassState::Idle;

        let mut registry = ScriptRegistry::new();
        registry.start_tracking(driver).await?;
        self.state = PassState::Tracking(registry);
        Ok(())
    }

    /// Stop tracking through aggregation. The registry is dropped on return.
    async fn gather(&mut self, driver: &dyn Driver) -> Result<Vec<CorrelatedListener>> {
        let mut registry = match mem::replace(&mut self.state, PassState::Fetching) {
            PassState::Tracking(registry) => registry,
            _ => return Err(GatherError::NotTracking),
        };

        registry.stop_tracking(driver).await?;

        let targets = enumerate_targets(driver, &self.config.element_selector).await?;
        let fetcher = ListenerFetcher::new(driver, &self.config.object_group);
        collect_listeners(&fetcher, &registry, &targets).await
    }

    fn commit(&mut self, artifact: Artifact) -> Artifact {
        let outcome = if artifact.is_failure() {
            Outcome::Failure
        } else {
            Outcome::Success
        };
        self.state = PassState::Committed(outcome);
        self.artifact = Some(artifact.clone());
        artifact
    }
}

#[async_trait]
impl Gatherer for EventListenersGatherer {
    fn name(&self) -> &'static str {
        "EventListeners"
    }

    async fn before_pass(&mut self, ctx: &PassContext<'_>) -> Result<()> {
        info!("Starting listener tracking for {}", ctx.url);
        self.start(ctx.driver).await
    }

    async fn after_pass(&mut self, ctx: &PassContext<'_>) -> Artifact {
        let artifact = match self.gather(ctx.driver).await {
            Ok(listeners) => {
                info!("Collected {} listeners for {}", listeners.len(), ctx.url);
                Artifact::Listeners(listeners)
            }
            Err(e) => {
                warn!("Listener collection failed for {}: {}", ctx.url, e);
                Artifact::failure()
            }
        };

        self.commit(artifact)
    }
}
