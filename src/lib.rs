//! Listenscope - event listener inventory for a page load.
//!
//! For one observed load of a page, the gatherer lists every event listener
//! attached to the page's elements, `document`, and `window`, and annotates
//! each with the script, line, and column that defined it. Deciding which
//! listeners are a problem is left to whoever consumes the artifact.
//!
//! The instrumentation layer is abstracted behind [`driver::Driver`];
//! [`driver::ReplayDriver`] serves recorded sessions through it.

pub mod config;
pub mod driver;
pub mod error;
pub mod gatherer;
pub mod models;
pub mod report;
pub mod scanner;

pub use config::{Config, GathererConfig};
pub use driver::{Driver, DriverError, ReplayDriver};
pub use error::GatherError;
pub use gatherer::{EventListenersGatherer, Gatherer, PassContext};
pub use models::{Artifact, CorrelatedListener, FailureSentinel, FAILURE_MESSAGE};
