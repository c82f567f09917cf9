//! Presentation hooks used while training instances.

use tracing::{error, info};

/// Receives human-facing progress output. Carries no data contract beyond
/// the strings it is given.
pub trait Reporter: Send + Sync + std::fmt::Debug {
    fn section(&self, title: &str);
    fn subsection(&self, title: &str);
    fn text(&self, body: &str);
    fn fatal(&self, message: &str);
}

/// Renders everything as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn section(&self, title: &str) {
        info!("== {} ==", title);
    }

    fn subsection(&self, title: &str) {
        info!("-- {} --", title);
    }

    fn text(&self, body: &str) {
        for line in body.lines() {
            info!("{}", line);
        }
    }

    fn fatal(&self, message: &str) {
        error!("{}", message);
    }
}
