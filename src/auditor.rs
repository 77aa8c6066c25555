//! Per-request audit trail.
//!
//! An [`Auditor`] is created at the start of each request and owned by the worker serving
//! it. It records the lifecycle events of the request (begin, component invocations,
//! compilations, cleanups, end) and mirrors each one to `tracing` with the request id.

use crate::ids::RequestId;
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One recorded lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Begin,
    Invoke { component: String },
    CompilationStarts { component: String, kind: String },
    CompilationStops { component: String },
    Cleanup { component: String },
    End,
}

#[derive(Debug)]
pub struct Auditor {
    request_id: RequestId,
    started: Instant,
    events: RefCell<Vec<AuditEvent>>,
}

impl Auditor {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            started: Instant::now(),
            events: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    fn record(&self, event: AuditEvent) {
        self.events.borrow_mut().push(event);
    }

    pub fn begin(&self, method: &str, path: &str) {
        debug!(request_id = %self.request_id, method = %method, path = %path, "Request begins");
        self.record(AuditEvent::Begin);
    }

    pub fn invoke(&self, component: &str) {
        debug!(request_id = %self.request_id, component = %component, "Invoking component");
        self.record(AuditEvent::Invoke {
            component: component.to_string(),
        });
    }

    pub fn compilation_starts(&self, component: &str, kind: &str) {
        debug!(request_id = %self.request_id, component = %component, kind = %kind, "Compilation starts");
        self.record(AuditEvent::CompilationStarts {
            component: component.to_string(),
            kind: kind.to_string(),
        });
    }

    pub fn compilation_stops(&self, component: &str) {
        debug!(request_id = %self.request_id, component = %component, "Compilation stops");
        self.record(AuditEvent::CompilationStops {
            component: component.to_string(),
        });
    }

    pub fn cleanup(&self, component: &str) {
        debug!(request_id = %self.request_id, component = %component, "Cleaning up component");
        self.record(AuditEvent::Cleanup {
            component: component.to_string(),
        });
    }

    /// Record the end of the request and log its total duration.
    pub fn end(&self, status: u16) {
        let elapsed = self.elapsed();
        info!(
            request_id = %self.request_id,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request complete"
        );
        self.record(AuditEvent::End);
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_events_in_order() {
        let auditor = Auditor::new(RequestId::new());
        auditor.begin("GET", "/hello");
        auditor.invoke("home");
        auditor.cleanup("home");
        auditor.end(200);
        assert_eq!(
            auditor.events(),
            vec![
                AuditEvent::Begin,
                AuditEvent::Invoke {
                    component: "home".into()
                },
                AuditEvent::Cleanup {
                    component: "home".into()
                },
                AuditEvent::End,
            ]
        );
    }
}
