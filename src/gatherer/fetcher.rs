//! Listener retrieval for a single target.
//!
//! A target is first resolved to a remote object (globals by evaluating
//! their name, elements by resolving their node id). The listener query is
//! then issued against that object. Either step failing fails the whole
//! fetch; no partial listener list is ever returned. Individual records
//! that cannot be read are skipped, the rest of the response is kept.

use crate::driver::{protocol, Driver};
use crate::error::{GatherError, Result};
use crate::models::{RawListenerRecord, TargetReference};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Listeners attached to one target, before correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetListeners {
    pub listeners: Vec<RawListenerRecord>,
    /// Description of the resolved object, e.g. `div#app` or `#document`.
    pub target_label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteObject {
    #[serde(default)]
    object_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    result: RemoteObject,
    #[serde(default)]
    exception_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResolveNodeResponse {
    object: RemoteObject,
}

#[derive(Debug, Deserialize)]
struct EventListenersResponse {
    listeners: Vec<Value>,
}

/// A remote object that listeners can be queried on.
struct ObjectHandle {
    object_id: String,
    description: String,
}

/// Fetches the listeners attached to targets over a driver.
pub struct ListenerFetcher<'a> {
    driver: &'a dyn Driver,
    object_group: &'a str,
}

impl<'a> ListenerFetcher<'a> {
    /// Remote objects are created in `object_group`.
    pub fn new(driver: &'a dyn Driver, object_group: &'a str) -> Self {
        Self {
            driver,
            object_group,
        }
    }

    /// Resolve `target` and query the listeners attached to it.
    pub async fn fetch(&self, target: &TargetReference) -> Result<TargetListeners> {
        let handle = self.resolve(target).await?;

        let response = self
            .driver
            .send_command(
                protocol::GET_EVENT_LISTENERS,
                json!({ "objectId": handle.object_id }),
            )
            .await
            .map_err(|source| GatherError::Fetch {
                target: target.to_string(),
                source,
            })?;
        let response: EventListenersResponse = parse(protocol::GET_EVENT_LISTENERS, response)?;

        let listeners: Vec<RawListenerRecord> = response
            .listeners
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable listener record on {}: {}", target, e);
                    None
                }
            })
            .collect();

        debug!(
            "{} ({}) has {} listeners",
            target,
            handle.description,
            listeners.len()
        );

        Ok(TargetListeners {
            listeners,
            target_label: handle.description,
        })
    }

    async fn resolve(&self, target: &TargetReference) -> Result<ObjectHandle> {
        let object = match target {
            TargetReference::Global(name) => {
                let response = self
                    .command(
                        target,
                        protocol::RUNTIME_EVALUATE,
                        json!({
                            "expression": name.as_str(),
                            "objectGroup": self.object_group,
                        }),
                    )
                    .await?;
                let response: EvaluateResponse = parse(protocol::RUNTIME_EVALUATE, response)?;

                if let Some(details) = response.exception_details {
                    return Err(GatherError::Resolution {
                        target: target.to_string(),
                        reason: format!("evaluation threw: {}", details),
                    });
                }
                response.result
            }
            TargetReference::Node(node_id) => {
                let response = self
                    .command(
                        target,
                        protocol::DOM_RESOLVE_NODE,
                        json!({
                            "nodeId": node_id.0,
                            "objectGroup": self.object_group,
                        }),
                    )
                    .await?;
                let response: ResolveNodeResponse = parse(protocol::DOM_RESOLVE_NODE, response)?;
                response.object
            }
        };

        let object_id = object.object_id.ok_or_else(|| GatherError::Resolution {
            target: target.to_string(),
            reason: "no remote object id returned".to_string(),
        })?;

        Ok(ObjectHandle {
            object_id,
            description: object.description.unwrap_or_else(|| target.to_string()),
        })
    }

    /// Send a resolution command, mapping driver failures to resolution errors.
    async fn command(
        &self,
        target: &TargetReference,
        method: &'static str,
        params: Value,
    ) -> Result<Value> {
        self.driver
            .send_command(method, params)
            .await
            .map_err(|e| GatherError::Resolution {
                target: target.to_string(),
                reason: e.to_string(),
            })
    }
}

fn parse<T: DeserializeOwned>(method: &'static str, response: Value) -> Result<T> {
    serde_json::from_value(response)
        .map_err(|source| GatherError::MalformedResponse { method, source })
}
