//! Ordered aggregation of listeners across targets.

use crate::driver::Driver;
use crate::error::{GatherError, Result};
use crate::gatherer::correlator::correlate;
use crate::gatherer::fetcher::ListenerFetcher;
use crate::gatherer::registry::ScriptRegistry;
use crate::models::{CorrelatedListener, GlobalName, TargetReference};
use tracing::{debug, info};

/// Enumerate every target of a pass: the elements matching `selector` in
/// traversal order, then `document`, then `window`.
pub async fn enumerate_targets(
    driver: &dyn Driver,
    selector: &str,
) -> Result<Vec<TargetReference>> {
    let mut targets = driver
        .query_selector_all(selector)
        .await
        .map_err(GatherError::Enumeration)?;

    targets.push(TargetReference::Global(GlobalName::Document));
    targets.push(TargetReference::Global(GlobalName::Window));

    info!("Enumerated {} targets", targets.len());
    Ok(targets)
}

/// Fetch and correlate the listeners of each target, one target at a time.
///
/// The result lists targets in the order given, and each target's listeners
/// in the order the listener query returned them. The first failing target
/// fails the whole collection.
pub async fn collect_listeners(
    fetcher: &ListenerFetcher<'_>,
    registry: &ScriptRegistry,
    targets: &[TargetReference],
) -> Result<Vec<CorrelatedListener>> {
    let mut collected = Vec::new();

    for target in targets {
        let fetched = fetcher.fetch(target).await?;
        let correlated = correlate(&fetched, registry);

        debug!(
            "{}: {} of {} listeners correlated",
            fetched.target_label,
            correlated.len(),
            fetched.listeners.len()
        );
        collected.extend(correlated);
    }

    Ok(collected)
}
