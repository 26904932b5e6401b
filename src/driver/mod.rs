//! The instrumentation driver seam.
//!
//! The gatherer never talks to a browser directly. It issues protocol
//! commands, subscribes to protocol events, and enumerates elements through
//! a [`Driver`] supplied by the caller.

pub mod replay;

pub use replay::{RecordedElement, RecordedObject, RecordedSession, ReplayDriver};

use crate::models::TargetReference;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Protocol methods and events used by the gatherer.
pub mod protocol {
    pub const DEBUGGER_ENABLE: &str = "Debugger.enable";
    pub const DEBUGGER_DISABLE: &str = "Debugger.disable";
    pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";
    pub const RUNTIME_EVALUATE: &str = "Runtime.evaluate";
    pub const DOM_RESOLVE_NODE: &str = "DOM.resolveNode";
    pub const GET_EVENT_LISTENERS: &str = "DOMDebugger.getEventListeners";
    /// Not a protocol method; names the element enumeration capability.
    pub const QUERY_SELECTOR_ALL: &str = "querySelectorAll";
}

/// Receiving end of an event subscription. The driver pushes every event
/// payload into the sink until the subscription is removed.
pub type EventSink = UnboundedSender<Value>;

/// Handle returned by [`Driver::on`]. Unsubscribing requires this exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Errors raised by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("{method} failed: {message}")]
    Command { method: String, message: String },

    #[error("no subscription {id:?} registered for {event}")]
    UnknownSubscription { event: String, id: SubscriptionId },
}

impl DriverError {
    pub fn command(method: &str, message: impl Into<String>) -> Self {
        DriverError::Command {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

/// Capabilities the gatherer needs from the instrumentation layer.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Send one protocol command and wait for its result.
    async fn send_command(&self, method: &str, params: Value) -> Result<Value, DriverError>;

    /// Subscribe `sink` to `event`.
    fn on(&self, event: &str, sink: EventSink) -> SubscriptionId;

    /// Remove the subscription identified by `id`.
    fn off(&self, event: &str, id: SubscriptionId) -> Result<(), DriverError>;

    /// Every element matching `selector`, in document order, including
    /// elements inside shadow roots.
    async fn query_selector_all(&self, selector: &str)
        -> Result<Vec<TargetReference>, DriverError>;
}
