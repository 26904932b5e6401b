//! A driver that answers from a recorded session.
//!
//! A [`RecordedSession`] captures what a page exposed during one load: the
//! scripts it parsed, its elements, the two globals, and the listeners
//! attached to each remote object. [`ReplayDriver`] serves protocol commands
//! from that recording and delivers parse notifications to subscribers.

use super::{protocol, Driver, DriverError, EventSink, SubscriptionId};
use crate::models::{NodeId, TargetReference};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A remote object as recorded: its id and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedObject {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A page element matched by the element selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedElement {
    pub node_id: i64,
    #[serde(flatten)]
    pub object: RecordedObject,
}

/// Everything the replay driver needs to answer one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSession {
    /// Url of the recorded page.
    #[serde(default)]
    pub url: String,

    /// `Debugger.scriptParsed` payloads delivered when tracking is enabled.
    #[serde(default)]
    pub scripts: Vec<Value>,

    /// Payloads delivered when tracking is disabled. Nobody should be
    /// listening anymore by then.
    #[serde(default)]
    pub late_scripts: Vec<Value>,

    /// Elements in document order.
    #[serde(default)]
    pub elements: Vec<RecordedElement>,

    /// `document` and `window`, keyed by expression.
    #[serde(default)]
    pub globals: BTreeMap<String, RecordedObject>,

    /// Raw listener payloads keyed by object id.
    #[serde(default)]
    pub listeners: HashMap<String, Vec<Value>>,

    /// Methods that always fail.
    #[serde(default)]
    pub failing_methods: Vec<String>,

    /// Object ids whose listener query fails.
    #[serde(default)]
    pub failing_objects: Vec<String>,
}

impl RecordedSession {
    /// Load a recorded session from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;

        let session: RecordedSession = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

        Ok(session)
    }
}

type Subscribers = HashMap<String, Vec<(SubscriptionId, EventSink)>>;

/// Serves a [`RecordedSession`] through the [`Driver`] interface.
pub struct ReplayDriver {
    session: RecordedSession,
    subscribers: Mutex<Subscribers>,
    next_subscription: AtomicU64,
    commands: Mutex<Vec<(String, Value)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReplayDriver {
    /// Create a driver for the given session.
    pub fn new(session: RecordedSession) -> Self {
        Self {
            session,
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &RecordedSession {
        &self.session
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<(String, Value)> {
        lock(&self.commands).clone()
    }

    /// Method names of every command received so far, in order.
    pub fn methods(&self) -> Vec<String> {
        lock(&self.commands)
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        lock(&self.subscribers).get(event).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every subscriber of `event`. Returns how many
    /// subscribers received it.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let subscribers = lock(&self.subscribers);
        let Some(sinks) = subscribers.get(event) else {
            debug!("No subscribers for {}, dropping event", event);
            return 0;
        };

        sinks
            .iter()
            .filter(|(_, sink)| sink.send(payload.clone()).is_ok())
            .count()
    }

    fn record_command(&self, method: &str, params: &Value) {
        lock(&self.commands).push((method.to_string(), params.clone()));
    }

    fn scripted_failure(&self, method: &str) -> Result<(), DriverError> {
        if self.session.failing_methods.iter().any(|m| m == method) {
            return Err(DriverError::command(method, "scripted failure"));
        }
        Ok(())
    }

    fn emit_all(&self, payloads: &[Value]) {
        for payload in payloads {
            self.emit(protocol::SCRIPT_PARSED, payload);
        }
    }

    fn resolve_node(&self, params: &Value) -> Result<Value, DriverError> {
        let node_id = params
            .get("nodeId")
            .and_then(Value::as_i64)
            .ok_or_else(|| DriverError::command(protocol::DOM_RESOLVE_NODE, "missing nodeId"))?;

        let element = self
            .session
            .elements
            .iter()
            .find(|e| e.node_id == node_id)
            .ok_or_else(|| {
                DriverError::command(
                    protocol::DOM_RESOLVE_NODE,
                    format!("no node with given id found: {}", node_id),
                )
            })?;

        Ok(json!({ "object": remote_object(&element.object, Some("node")) }))
    }

    fn evaluate(&self, params: &Value) -> Result<Value, DriverError> {
        let expression = params
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::command(protocol::RUNTIME_EVALUATE, "missing expression"))?;

        let object = self.session.globals.get(expression).ok_or_else(|| {
            DriverError::command(
                protocol::RUNTIME_EVALUATE,
                format!("{} is not defined", expression),
            )
        })?;

        Ok(json!({ "result": remote_object(object, None) }))
    }

    fn event_listeners(&self, params: &Value) -> Result<Value, DriverError> {
        let object_id = params
            .get("objectId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DriverError::command(protocol::GET_EVENT_LISTENERS, "missing objectId")
            })?;

        if self.session.failing_objects.iter().any(|id| id == object_id) {
            return Err(DriverError::command(
                protocol::GET_EVENT_LISTENERS,
                format!("could not find object with given id: {}", object_id),
            ));
        }

        let listeners = self
            .session
            .listeners
            .get(object_id)
            .cloned()
            .unwrap_or_default();

        Ok(json!({ "listeners": listeners }))
    }
}

fn remote_object(object: &RecordedObject, subtype: Option<&str>) -> Value {
    let mut value = json!({
        "type": "object",
        "objectId": object.object_id,
    });
    if let Some(description) = &object.description {
        value["description"] = json!(description);
    }
    if let Some(subtype) = subtype {
        value["subtype"] = json!(subtype);
    }
    value
}

#[async_trait]
impl Driver for ReplayDriver {
    async fn send_command(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        debug!("Replaying {} with params: {}", method, params);
        self.record_command(method, &params);
        self.scripted_failure(method)?;

        match method {
            protocol::DEBUGGER_ENABLE => {
                self.emit_all(&self.session.scripts);
                Ok(json!({ "debuggerId": "replay" }))
            }
            protocol::DEBUGGER_DISABLE => {
                self.emit_all(&self.session.late_scripts);
                Ok(json!({}))
            }
            protocol::DOM_RESOLVE_NODE => self.resolve_node(&params),
            protocol::RUNTIME_EVALUATE => self.evaluate(&params),
            protocol::GET_EVENT_LISTENERS => self.event_listeners(&params),
            _ => {
                debug!("No recording for {}, answering with an empty result", method);
                Ok(json!({}))
            }
        }
    }

    fn on(&self, event: &str, sink: EventSink) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        lock(&self.subscribers)
            .entry(event.to_string())
            .or_default()
            .push((id, sink));
        id
    }

    fn off(&self, event: &str, id: SubscriptionId) -> Result<(), DriverError> {
        let mut subscribers = lock(&self.subscribers);
        let sinks = subscribers.get_mut(event);
        let position = sinks
            .as_ref()
            .and_then(|sinks| sinks.iter().position(|(sub, _)| *sub == id));

        match (sinks, position) {
            (Some(sinks), Some(index)) => {
                sinks.remove(index);
                Ok(())
            }
            _ => Err(DriverError::UnknownSubscription {
                event: event.to_string(),
                id,
            }),
        }
    }

    async fn query_selector_all(
        &self,
        selector: &str,
    ) -> Result<Vec<TargetReference>, DriverError> {
        debug!("Replaying element query for selector: {}", selector);
        self.record_command(protocol::QUERY_SELECTOR_ALL, &json!({ "selector": selector }));
        self.scripted_failure(protocol::QUERY_SELECTOR_ALL)?;

        Ok(self
            .session
            .elements
            .iter()
            .map(|e| TargetReference::Node(NodeId(e.node_id)))
            .collect())
    }
}
