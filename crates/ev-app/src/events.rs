//! Synchronous run-event delivery.
//!
//! Listeners are keyed by [`RunEventKind`] and invoked in registration order.
//! A listener that returns an error or panics is logged and skipped; delivery
//! continues with the next listener.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use ev_core::{RunEvent, RunEventKind};

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = Result<(), ListenerError>;

type Listener = Box<dyn FnMut(&RunEvent) -> ListenerResult + Send>;

#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<RunEventKind, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: RunEventKind, listener: F)
    where
        F: FnMut(&RunEvent) -> ListenerResult + Send + 'static,
    {
        self.listeners
            .entry(kind)
            .or_default()
            .push(Box::new(listener));
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Returns how many listeners handled the event without error or panic.
    pub fn emit(&mut self, event: &RunEvent) -> usize {
        let kind = event.kind();
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return 0;
        };

        let mut delivered = 0;
        for (index, listener) in listeners.iter_mut().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(error)) => {
                    tracing::error!(
                        event = %kind,
                        listener = index,
                        run_id = event.run_id(),
                        %error,
                        "listener failed"
                    );
                }
                Err(payload) => {
                    tracing::error!(
                        event = %kind,
                        listener = index,
                        run_id = event.run_id(),
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: RunEventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .listeners
            .iter()
            .map(|(kind, listeners)| (kind.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ev_core::RunStarted;
    use std::sync::{Arc, Mutex};

    fn started() -> RunEvent {
        RunStarted {
            run_id: "r1".to_string(),
            scenario_id: "S1".to_string(),
            timestamp: Utc::now(),
        }
        .into()
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(RunEventKind::RunStarted, move |_| {
                seen.lock().unwrap().push(tag);
                Ok(())
            });
        }

        assert_eq!(bus.emit(&started()), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_listener_is_isolated() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        bus.subscribe(RunEventKind::RunStarted, |_| Err("boom".into()));
        let counter = Arc::clone(&calls);
        bus.subscribe(RunEventKind::RunStarted, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        assert_eq!(bus.emit(&started()), 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        bus.subscribe(RunEventKind::RunStarted, |_| panic!("listener bug"));
        let counter = Arc::clone(&calls);
        bus.subscribe(RunEventKind::RunStarted, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        assert_eq!(bus.emit(&started()), 1);
        assert_eq!(bus.emit(&started()), 1);
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn panic_payloads_are_described() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(format!("{} formatted", 1));
        assert_eq!(panic_message(payload.as_ref()), "1 formatted");

        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn other_kinds_are_not_notified() {
        let mut bus = EventBus::new();
        bus.subscribe(RunEventKind::RunCompleted, |_| Ok(()));
        assert_eq!(bus.emit(&started()), 0);
        assert_eq!(bus.listener_count(RunEventKind::RunCompleted), 1);
        assert_eq!(bus.listener_count(RunEventKind::RunFailed), 0);
    }
}
