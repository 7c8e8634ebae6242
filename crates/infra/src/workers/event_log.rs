use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use storefront_events::{EventBus, Subscription};

use crate::publisher::JsonEnvelope;

const TICK: Duration = Duration::from_millis(250);

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<u64>>,
}

impl WorkerHandle {
    /// Request graceful shutdown, wait for the worker to stop and return how
    /// many envelopes it handled.
    pub fn shutdown(mut self) -> u64 {
        let _ = self.shutdown.send(());
        match self.join.take().map(|j| j.join()) {
            Some(Ok(handled)) => handled,
            Some(Err(_)) => {
                warn!("event log worker panicked");
                0
            }
            None => 0,
        }
    }
}

/// Logs every committed event that crosses the bus.
///
/// - Subscribes before the thread starts, so nothing published after
///   `spawn` returns is missed
/// - Optional `sink` sees each envelope after it is logged
/// - Stops on shutdown or when the bus goes away
#[derive(Debug)]
pub struct EventLogWorker;

impl EventLogWorker {
    pub fn spawn<B>(name: &'static str, bus: &B) -> io::Result<WorkerHandle>
    where
        B: EventBus<JsonEnvelope> + ?Sized,
    {
        Self::spawn_with(name, bus, |_| {})
    }

    pub fn spawn_with<B, F>(name: &'static str, bus: &B, sink: F) -> io::Result<WorkerHandle>
    where
        B: EventBus<JsonEnvelope> + ?Sized,
        F: FnMut(&JsonEnvelope) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, sink))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<F>(
    name: &'static str,
    sub: Subscription<JsonEnvelope>,
    shutdown_rx: mpsc::Receiver<()>,
    mut sink: F,
) -> u64
where
    F: FnMut(&JsonEnvelope),
{
    let mut handled = 0u64;

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(envelope) => {
                info!(
                    worker = name,
                    event_id = %envelope.event_id(),
                    event_type = envelope.event_type(),
                    event_version = envelope.event_version(),
                    aggregate_type = envelope.aggregate_type(),
                    aggregate_id = %envelope.aggregate_id(),
                    occurred_at = %envelope.occurred_at(),
                    "domain event"
                );
                sink(&envelope);
                handled += 1;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use storefront_events::{EventEnvelope, InMemoryEventBus};
    use uuid::Uuid;

    fn test_envelope(event_type: &str) -> JsonEnvelope {
        EventEnvelope::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            "inventory.product",
            event_type,
            1,
            Utc::now(),
            serde_json::json!({ "quantity": 1 }),
        )
    }

    #[test]
    fn logs_published_envelopes_until_shutdown() {
        let bus: Arc<InMemoryEventBus<JsonEnvelope>> = Arc::new(InMemoryEventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_worker = Arc::clone(&seen);

        let handle = EventLogWorker::spawn_with("event-log-test", &bus, move |envelope| {
            seen_in_worker
                .lock()
                .unwrap()
                .push(envelope.event_type().to_string());
        })
        .unwrap();

        bus.publish(test_envelope("inventory.product.sold")).unwrap();
        bus.publish(test_envelope("inventory.product.restocked")).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while seen.lock().unwrap().len() < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(handle.shutdown(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["inventory.product.sold", "inventory.product.restocked"]
        );
    }

    #[test]
    fn stops_when_the_bus_is_dropped() {
        let bus: InMemoryEventBus<JsonEnvelope> = InMemoryEventBus::new();
        let handle = EventLogWorker::spawn("event-log-drop", &bus).unwrap();
        drop(bus);
        assert_eq!(handle.shutdown(), 0);
    }
}
