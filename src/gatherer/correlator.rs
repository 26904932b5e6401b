//! Join of one target's listeners against the script registry.

use crate::gatherer::fetcher::TargetListeners;
use crate::gatherer::registry::ScriptRegistry;
use crate::models::CorrelatedListener;
use tracing::debug;

/// Correlate every listener of `fetched` with the script that defined it.
///
/// Listeners whose script was never parsed during the tracking window, or
/// that carry no script id at all, are dropped. The output keeps the order
/// of `fetched.listeners`.
pub fn correlate(fetched: &TargetListeners, registry: &ScriptRegistry) -> Vec<CorrelatedListener> {
    fetched
        .listeners
        .iter()
        .filter_map(|record| {
            let script = record.script_id.as_deref().and_then(|id| registry.get(id));
            match script {
                Some(script) => Some(CorrelatedListener::merge(
                    record,
                    script,
                    &fetched.target_label,
                )),
                None => {
                    debug!(
                        "Dropping {} listener on {}: script {} unknown",
                        record.event_type,
                        fetched.target_label,
                        record.script_id.as_deref().unwrap_or("<none>")
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParsedScript, RawListenerRecord};
    use serde_json::{json, Value};

    fn listener(event_type: &str, script_id: &str, line: u64, col: u64) -> RawListenerRecord {
        serde_json::from_value(json!({
            "type": event_type,
            "useCapture": false,
            "passive": false,
            "once": false,
            "scriptId": script_id,
            "lineNumber": line,
            "columnNumber": col
        }))
        .unwrap()
    }

    fn registry(scripts: Value) -> ScriptRegistry {
        let mut registry = ScriptRegistry::new();
        let scripts: Vec<ParsedScript> = serde_json::from_value(scripts).unwrap();
        for script in scripts {
            registry.insert(script);
        }
        registry
    }

    #[test]
    fn test_known_script_is_merged() {
        let fetched = TargetListeners {
            listeners: vec![listener("scroll", "7", 10, 4)],
            target_label: "#document".to_string(),
        };
        let registry = registry(json!([{"scriptId": "7", "url": "a.js"}]));

        let correlated = correlate(&fetched, &registry);

        assert_eq!(correlated.len(), 1);
        let first = &correlated[0];
        assert_eq!(first.event_type, "scroll");
        assert_eq!(first.script_id, "7");
        assert_eq!(first.line_number, 10);
        assert_eq!(first.column_number, 4);
        assert_eq!(first.url, "a.js");
        assert_eq!(first.object_name, "#document");
        assert_eq!(first.line, 11);
        assert_eq!(first.col, 5);
    }

    #[test]
    fn test_unknown_scripts_are_dropped_in_order() {
        let fetched = TargetListeners {
            listeners: vec![
                listener("a", "1", 0, 0),
                listener("b", "404", 0, 0),
                listener("c", "2", 5, 6),
                listener("d", "1", 7, 8),
            ],
            target_label: "div".to_string(),
        };
        let registry = registry(json!([
            {"scriptId": "1", "url": "one.js"},
            {"scriptId": "2", "url": "two.js"}
        ]));

        let correlated = correlate(&fetched, &registry);

        let types: Vec<_> = correlated.iter().map(|l| l.event_type.as_str()).collect();
        assert_eq!(types, vec!["a", "c", "d"]);
        for listener in &correlated {
            assert_eq!(listener.line, listener.line_number + 1);
            assert_eq!(listener.col, listener.column_number + 1);
        }
    }

    #[test]
    fn test_record_without_script_id_is_dropped() {
        let anonymous: RawListenerRecord =
            serde_json::from_value(json!({"type": "load", "lineNumber": 0, "columnNumber": 0}))
                .unwrap();
        let fetched = TargetListeners {
            listeners: vec![listener("scroll", "7", 10, 4), anonymous],
            target_label: "#document".to_string(),
        };
        let registry = registry(json!([{"scriptId": "7", "url": "a.js"}]));

        let correlated = correlate(&fetched, &registry);

        assert_eq!(correlated.len(), 1);
        assert_eq!(correlated[0].event_type, "scroll");
    }

    #[test]
    fn test_empty_registry_drops_everything() {
        let fetched = TargetListeners {
            listeners: vec![listener("scroll", "7", 10, 4)],
            target_label: "#document".to_string(),
        };

        assert!(correlate(&fetched, &ScriptRegistry::new()).is_empty());
    }
}
