//! Per-kind listener lists with removal by identity.
//!
//! [`ListenerRegistry`] keeps, for every [`EventKind`], the listeners in
//! registration order. A listener is an `Arc` closure; [`off`] compares by
//! pointer, so callers keep a clone of the `Arc` they registered.
//!
//! [`off`]: ListenerRegistry::off

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::{ClientEvent, EventKind};

/// Shared callback invoked for each published [`ClientEvent`].
pub type Listener = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Wraps a closure as a [`Listener`].
///
/// Keep the returned `Arc` if you intend to unregister it later.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&ClientEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered listener lists keyed by [`EventKind`].
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(EventKind, usize)> = self
            .listeners
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        counts.sort();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the list for `kind`. Duplicates are allowed.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    /// Removes every registration of `listener` under `kind`.
    ///
    /// Returns the number of registrations removed.
    pub fn off(&mut self, kind: EventKind, listener: &Listener) -> usize {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return 0;
        };
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = before - list.len();
        if list.is_empty() {
            self.listeners.remove(&kind);
        }
        removed
    }

    /// Returns the number of listeners registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Returns a copy of the listeners for `kind`, in registration order.
    #[must_use]
    pub fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners
            .get(&kind)
            .map(|list| list.iter().map(Arc::clone).collect())
            .unwrap_or_default()
    }
}

/// Calls each listener in order, catching panics so one faulty listener
/// cannot stop delivery to the rest.
///
/// Returns the number of listeners that completed normally.
pub fn deliver(listeners: &[Listener], event: &ClientEvent) -> usize {
    let mut delivered = 0;
    for (index, listener) in listeners.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| listener(event))) {
            Ok(()) => delivered += 1,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    event = %event.kind(),
                    listener = index,
                    %reason,
                    "listener panicked; continuing delivery"
                );
            }
        }
    }
    delivered
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{ErrorEvent, PixelUpdate};

    fn error_event() -> ClientEvent {
        ClientEvent::Error(ErrorEvent {
            message: "boom".to_string(),
        })
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        listener(move |_| {
            if let Ok(mut log) = log.lock() {
                log.push(name);
            }
        })
    }

    fn emit(registry: &ListenerRegistry, event: &ClientEvent) -> usize {
        deliver(&registry.snapshot(event.kind()), event)
    }

    fn recorded(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
        log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    #[test]
    fn emit_runs_listeners_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::Error, recorder(&log, "a"));
        registry.on(EventKind::Error, recorder(&log, "b"));
        registry.on(EventKind::Error, recorder(&log, "c"));

        assert_eq!(emit(&registry, &error_event()), 3);
        assert_eq!(recorded(&log), vec!["a", "b", "c"]);
    }

    #[test]
    fn emit_only_reaches_matching_kind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::Open, recorder(&log, "open"));
        registry.on(EventKind::Error, recorder(&log, "error"));

        emit(&registry, &error_event());
        assert_eq!(recorded(&log), vec!["error"]);
    }

    #[test]
    fn duplicates_accumulate_and_off_removes_all() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let dup = recorder(&log, "dup");
        let other = recorder(&log, "other");
        registry.on(EventKind::Error, Arc::clone(&dup));
        registry.on(EventKind::Error, Arc::clone(&other));
        registry.on(EventKind::Error, Arc::clone(&dup));

        emit(&registry, &error_event());
        assert_eq!(recorded(&log), vec!["dup", "other", "dup"]);

        assert_eq!(registry.off(EventKind::Error, &dup), 2);
        assert_eq!(registry.count(EventKind::Error), 1);
    }

    #[test]
    fn off_unknown_listener_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::Error, recorder(&log, "kept"));
        let stranger = recorder(&log, "stranger");

        assert_eq!(registry.off(EventKind::Error, &stranger), 0);
        assert_eq!(registry.off(EventKind::Open, &stranger), 0);

        emit(&registry, &error_event());
        assert_eq!(recorded(&log), vec!["kept"]);
    }

    #[test]
    fn identical_closures_are_distinct_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let first = recorder(&log, "same");
        let second = recorder(&log, "same");
        registry.on(EventKind::Error, Arc::clone(&first));
        registry.on(EventKind::Error, second);

        registry.off(EventKind::Error, &first);
        assert_eq!(registry.count(EventKind::Error), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::PixelUpdate, recorder(&log, "before"));
        registry.on(
            EventKind::PixelUpdate,
            listener(|_| panic!("listener failure")),
        );
        registry.on(EventKind::PixelUpdate, recorder(&log, "after"));

        let event = ClientEvent::PixelUpdate(PixelUpdate {
            x: 0,
            y: 0,
            color: serde_json::json!("#000"),
            user_id: None,
            timestamp: None,
        });
        assert_eq!(emit(&registry, &event), 2);
        assert_eq!(recorded(&log), vec!["before", "after"]);
    }

    #[test]
    fn emit_with_no_listeners_delivers_nothing() {
        let registry = ListenerRegistry::new();
        assert_eq!(emit(&registry, &error_event()), 0);
    }
}
