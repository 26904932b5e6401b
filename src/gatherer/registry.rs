//! Per-pass cache of parsed scripts.
//!
//! The registry subscribes to parse notifications before enabling them, so
//! the scripts the enable call replays are captured too. Notifications are
//! buffered in the subscription channel and recorded when tracking stops;
//! nothing reads the registry before that.

use crate::driver::{protocol, Driver, SubscriptionId};
use crate::error::{GatherError, Result};
use crate::models::ParsedScript;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

/// A live parse-notification subscription.
struct Subscription {
    id: SubscriptionId,
    events: UnboundedReceiver<Value>,
}

/// Maps script ids to the metadata of the scripts parsed during a pass.
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, ParsedScript>,
    subscription: Option<Subscription>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribe to parse notifications and enable their delivery.
    ///
    /// If enabling fails the subscription is removed again and the error is
    /// returned to the caller.
    pub async fn start_tracking(&mut self, driver: &dyn Driver) -> Result<()> {
        if self.is_tracking() {
            return Err(GatherError::AlreadyTracking);
        }

        let (sink, events) = mpsc::unbounded_channel();
        let id = driver.on(protocol::SCRIPT_PARSED, sink);

        if let Err(source) = driver.send_command(protocol::DEBUGGER_ENABLE, json!({})).await {
            if let Err(e) = driver.off(protocol::SCRIPT_PARSED, id) {
                warn!("Failed to remove parse subscription after enable error: {}", e);
            }
            return Err(GatherError::Tracking {
                action: "enable",
                source,
            });
        }

        self.subscription = Some(Subscription { id, events });
        info!("Script tracking enabled");
        Ok(())
    }

    /// Remove the subscription, record everything it delivered, and disable
    /// parse notifications.
    pub async fn stop_tracking(&mut self, driver: &dyn Driver) -> Result<()> {
        let Subscription { id, mut events } =
            self.subscription.take().ok_or(GatherError::NotTracking)?;

        let unsubscribed = driver.off(protocol::SCRIPT_PARSED, id);

        events.close();
        while let Ok(payload) = events.try_recv() {
            self.record(payload);
        }

        unsubscribed.map_err(|source| GatherError::Tracking {
            action: "unsubscribe from",
            source,
        })?;

        driver
            .send_command(protocol::DEBUGGER_DISABLE, json!({}))
            .await
            .map_err(|source| GatherError::Tracking {
                action: "disable",
                source,
            })?;

        info!("Script tracking disabled with {} scripts known", self.len());
        Ok(())
    }

    /// Store one parse notification. A later notification for the same
    /// script id replaces the earlier one; malformed payloads are skipped.
    fn record(&mut self, payload: Value) {
        match serde_json::from_value::<ParsedScript>(payload) {
            Ok(script) => {
                debug!("Parsed script {} ({})", script.script_id, script.url);
                self.insert(script);
            }
            Err(e) => warn!("Ignoring malformed scriptParsed payload: {}", e),
        }
    }

    /// Insert a script, replacing any earlier entry with the same id.
    pub fn insert(&mut self, script: ParsedScript) {
        self.scripts.insert(script.script_id.clone(), script);
    }

    pub fn get(&self, script_id: &str) -> Option<&ParsedScript> {
        self.scripts.get(script_id)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
