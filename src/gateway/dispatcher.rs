use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::events::DispatchEvent;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Application-side reaction to dispatched gateway events.
pub trait DispatchHandler: Send + Sync + 'static {
    fn handle(&self, event: &DispatchEvent) -> HandlerResult;
}

impl<F> DispatchHandler for F
where
    F: Fn(&DispatchEvent) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, event: &DispatchEvent) -> HandlerResult {
        self(event)
    }
}

/// Routes dispatch events to catch-all handlers and to handlers keyed by
/// event name.
#[derive(Default, Clone)]
pub struct Dispatcher {
    catch_all: Vec<Arc<dyn DispatchHandler>>,
    by_event: HashMap<String, Vec<Arc<dyn DispatchHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_dispatch(&mut self, handler: Arc<dyn DispatchHandler>) {
        self.catch_all.push(handler);
    }

    pub fn on_event(&mut self, event_name: impl Into<String>, handler: Arc<dyn DispatchHandler>) {
        self.by_event
            .entry(event_name.into())
            .or_default()
            .push(handler);
    }

    pub fn has_handlers(&self) -> bool {
        !self.catch_all.is_empty() || !self.by_event.is_empty()
    }

    /// Run every matching handler. Each handler is isolated: an error or panic
    /// is logged and the remaining handlers still run. Returns the number of
    /// handlers that failed.
    pub fn dispatch(&self, event: &DispatchEvent) -> usize {
        let routed = self
            .by_event
            .get(&event.name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut failures = 0;
        for handler in self.catch_all.iter().chain(routed) {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(event = %event.name, seq = ?event.sequence, "dispatch handler failed: {e}");
                }
                Err(_) => {
                    failures += 1;
                    tracing::error!(event = %event.name, seq = ?event.sequence, "dispatch handler panicked");
                }
            }
        }
        failures
    }
}
