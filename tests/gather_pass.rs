use listenscope::driver::{protocol, RecordedSession, ReplayDriver};
use listenscope::gatherer::{EventListenersGatherer, Gatherer, Outcome, PassContext, PassPhase};
use listenscope::models::Artifact;
use listenscope::GathererConfig;
use serde_json::{json, Value};
use std::path::PathBuf;

fn fixture(name: &str) -> RecordedSession {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/sessions")
        .join(name);
    RecordedSession::load(&path).unwrap()
}

fn session(value: Value) -> RecordedSession {
    serde_json::from_value(value).unwrap()
}

async fn run_pass(driver: &ReplayDriver) -> (Artifact, EventListenersGatherer) {
    let url = driver.session().url.clone();
    let ctx = PassContext::new(driver, &url);
    let mut gatherer = EventListenersGatherer::new(GathererConfig::default());

    gatherer.before_pass(&ctx).await.unwrap();
    let artifact = gatherer.after_pass(&ctx).await;
    (artifact, gatherer)
}

fn document_and_window(document_listeners: Value) -> Value {
    json!({
        "globals": {
            "document": {"objectId": "doc", "description": "#document"},
            "window": {"objectId": "win", "description": "Window"}
        },
        "listeners": { "doc": document_listeners }
    })
}

#[tokio::test]
async fn scroll_listener_on_document_is_correlated() {
    let mut recorded = session(document_and_window(json!([
        {"type": "scroll", "scriptId": "7", "lineNumber": 10, "columnNumber": 4}
    ])));
    recorded.scripts = vec![json!({"scriptId": "7", "url": "a.js"})];
    let driver = ReplayDriver::new(recorded);

    let (artifact, _) = run_pass(&driver).await;

    let value = serde_json::to_value(&artifact).unwrap();
    assert_eq!(
        value,
        json!([{
            "type": "scroll",
            "scriptId": "7",
            "lineNumber": 10,
            "columnNumber": 4,
            "url": "a.js",
            "objectName": "#document",
            "line": 11,
            "col": 5
        }])
    );
}

#[tokio::test]
async fn listener_without_script_id_is_dropped_not_fatal() {
    let mut recorded = session(document_and_window(json!([
        {"type": "scroll", "scriptId": "7", "lineNumber": 10, "columnNumber": 4},
        {"type": "load", "lineNumber": 0, "columnNumber": 0}
    ])));
    recorded.scripts = vec![json!({"scriptId": "7", "url": "a.js"})];
    let driver = ReplayDriver::new(recorded);

    let (artifact, gatherer) = run_pass(&driver).await;

    assert!(!artifact.is_failure());
    let listeners = artifact.listeners();
    assert_eq!(listeners.len(), 1);
    assert_eq!(listeners[0].event_type, "scroll");
    assert_eq!(listeners[0].location(), "a.js:11:5");
    assert_eq!(gatherer.phase(), PassPhase::Committed(Outcome::Success));
}

#[tokio::test]
async fn unknown_script_yields_empty_list() {
    let driver = ReplayDriver::new(session(document_and_window(json!([
        {"type": "scroll", "scriptId": "7", "lineNumber": 10, "columnNumber": 4}
    ]))));

    let (artifact, gatherer) = run_pass(&driver).await;

    assert_eq!(artifact, Artifact::Listeners(vec![]));
    assert_eq!(gatherer.phase(), PassPhase::Committed(Outcome::Success));
}

#[tokio::test]
async fn any_fetch_failure_commits_sentinel() {
    let driver = ReplayDriver::new(fixture("broken_page.json"));

    let (artifact, gatherer) = run_pass(&driver).await;

    assert_eq!(
        serde_json::to_value(&artifact).unwrap(),
        json!({
            "rawValue": -1,
            "debugString": "Unable to collect passive events listener usage."
        })
    );
    assert_eq!(gatherer.phase(), PassPhase::Committed(Outcome::Failure));
}

#[tokio::test]
async fn multiple_targets_keep_traversal_order() {
    let driver = ReplayDriver::new(session(json!({
        "scripts": [{"scriptId": "1", "url": "x.js"}],
        "elements": [
            {"nodeId": 100, "objectId": "a", "description": "div#a"},
            {"nodeId": 200, "objectId": "b", "description": "div#b"}
        ],
        "globals": {
            "document": {"objectId": "doc", "description": "#document"},
            "window": {"objectId": "win", "description": "Window"}
        },
        "listeners": {
            "a": [{"type": "click", "scriptId": "1", "lineNumber": 1, "columnNumber": 1}],
            "b": [{"type": "keydown", "scriptId": "1", "lineNumber": 2, "columnNumber": 2}],
            "win": [{"type": "resize", "scriptId": "1", "lineNumber": 3, "columnNumber": 3}]
        }
    })));

    let (artifact, _) = run_pass(&driver).await;

    let names: Vec<_> = artifact
        .listeners()
        .iter()
        .map(|l| (l.object_name.as_str(), l.event_type.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("div#a", "click"), ("div#b", "keydown"), ("Window", "resize")]
    );
}

#[tokio::test]
async fn recorded_page_inventory() {
    let driver = ReplayDriver::new(fixture("news_page.json"));

    let (artifact, _) = run_pass(&driver).await;

    let summary: Vec<_> = artifact
        .listeners()
        .iter()
        .map(|l| format!("{} {} {}", l.object_name, l.event_type, l.location()))
        .collect();
    assert_eq!(
        summary,
        vec![
            "header.site-header click https://news.example.com/static/app.js:119:23",
            "div.carousel touchstart https://cdn.example.net/carousel.min.js:1:4411",
            "div.carousel touchmove https://cdn.example.net/carousel.min.js:1:4703",
            "#document DOMContentLoaded <inline>:16:13",
            "Window scroll https://news.example.com/static/app.js:403:7",
        ]
    );

    let header = &artifact.listeners()[0];
    assert_eq!(header.details.get("backendNodeId"), Some(&json!(12)));
    assert_eq!(
        header.details.get("hash"),
        Some(&json!("9c1185a5c5e9fc54612808977ee8f548b2258d31"))
    );
}

#[tokio::test]
async fn pass_issues_commands_in_lifecycle_order() {
    let driver = ReplayDriver::new(fixture("news_page.json"));

    run_pass(&driver).await;

    let methods = driver.methods();
    assert_eq!(methods[0], protocol::DEBUGGER_ENABLE);
    assert_eq!(methods[1], protocol::DEBUGGER_DISABLE);
    assert_eq!(methods[2], protocol::QUERY_SELECTOR_ALL);
    assert_eq!(
        driver.commands()[2].1,
        json!({"selector": GathererConfig::default().element_selector})
    );

    let lookups: Vec<_> = methods[3..].iter().map(String::as_str).collect();
    let mut expected = Vec::new();
    for _ in 0..3 {
        expected.push(protocol::DOM_RESOLVE_NODE);
        expected.push(protocol::GET_EVENT_LISTENERS);
    }
    for _ in 0..2 {
        expected.push(protocol::RUNTIME_EVALUATE);
        expected.push(protocol::GET_EVENT_LISTENERS);
    }
    assert_eq!(lookups, expected);
    assert_eq!(driver.subscriber_count(protocol::SCRIPT_PARSED), 0);
}

#[tokio::test]
async fn failing_stop_tracking_commits_sentinel() {
    let mut recorded = fixture("news_page.json");
    recorded.failing_methods = vec![protocol::DEBUGGER_DISABLE.to_string()];
    let driver = ReplayDriver::new(recorded);

    let (artifact, _) = run_pass(&driver).await;

    assert!(artifact.is_failure());
    assert!(!driver.methods().iter().any(|m| m == protocol::GET_EVENT_LISTENERS));
}

#[tokio::test]
async fn failing_enumeration_commits_sentinel() {
    let mut recorded = fixture("news_page.json");
    recorded.failing_methods = vec![protocol::QUERY_SELECTOR_ALL.to_string()];
    let driver = ReplayDriver::new(recorded);

    let (artifact, _) = run_pass(&driver).await;

    assert!(artifact.is_failure());
}

#[tokio::test]
async fn enable_failure_propagates_from_before_pass() {
    let mut recorded = fixture("news_page.json");
    recorded.failing_methods = vec![protocol::DEBUGGER_ENABLE.to_string()];
    let driver = ReplayDriver::new(recorded);
    let ctx = PassContext::new(&driver, "https://news.example.com/");
    let mut gatherer = EventListenersGatherer::new(GathererConfig::default());

    let result = gatherer.before_pass(&ctx).await;

    assert!(result.is_err());
    assert!(gatherer.artifact().is_none());
}

#[tokio::test]
async fn second_pass_starts_from_empty_registry() {
    let first = ReplayDriver::new(fixture("news_page.json"));
    let mut second_session = fixture("news_page.json");
    second_session.scripts.clear();
    let second = ReplayDriver::new(second_session);
    let mut gatherer = EventListenersGatherer::new(GathererConfig::default());

    let ctx = PassContext::new(&first, "first");
    gatherer.before_pass(&ctx).await.unwrap();
    let first_artifact = gatherer.after_pass(&ctx).await;

    let ctx = PassContext::new(&second, "second");
    gatherer.before_pass(&ctx).await.unwrap();
    let second_artifact = gatherer.after_pass(&ctx).await;

    assert_eq!(first_artifact.listeners().len(), 5);
    assert_eq!(second_artifact, Artifact::Listeners(vec![]));
}
