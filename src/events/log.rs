//! # Simple logging listener for debugging and demos.
//!
//! [`LogWriter`] prints engine events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [connected] dest=d1
//! [fetch-started] dest=d1 key=quote:ACME op_seq=1
//! [cache-hit] dest=d2 key=quote:ACME
//! [fetch-failed] dest=d1 key=quote:ACME err="error: connection refused"
//! [detached]
//! ```

use tokio::task::JoinHandle;

use super::{Bus, Event, EventKind};

/// Simple stdout logging listener.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// subscribe to the [`Bus`] directly for structured logging or metrics.
pub struct LogWriter;

impl LogWriter {
    /// Subscribes to the bus and spawns a worker that prints every event.
    ///
    /// The worker exits when the bus is dropped; abort the returned handle to
    /// stop it earlier.
    pub fn attach(bus: &Bus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                Self::write(&ev);
            }
        })
    }

    fn write(ev: &Event) {
        let dest = ev.destination.as_deref().unwrap_or("-");
        let key = ev.key.as_deref().unwrap_or("-");
        match ev.kind {
            EventKind::DestinationConnected => println!("[connected] dest={dest}"),
            EventKind::DestinationDisconnected => println!("[disconnected] dest={dest}"),
            EventKind::Detached => println!("[detached]"),
            EventKind::FetchStarted => {
                println!("[fetch-started] dest={dest} key={key} op_seq={:?}", ev.op_seq);
            }
            EventKind::FetchCompleted => println!("[fetch-completed] dest={dest} key={key}"),
            EventKind::FetchFailed => {
                println!("[fetch-failed] dest={dest} key={key} err={:?}", ev.reason);
            }
            EventKind::FetchDiscarded => {
                println!("[fetch-discarded] dest={dest} key={key} reason={:?}", ev.reason);
            }
            EventKind::DeadlineHit => println!("[deadline-hit] dest={dest} key={key}"),
            EventKind::CacheHit => println!("[cache-hit] dest={dest} key={key}"),
            EventKind::FetchShared => println!("[fetch-shared] dest={dest} key={key}"),
            EventKind::RetryScheduled => println!("[retry-scheduled] dest={dest} key={key}"),
            EventKind::ResetPublished => println!("[reset-published] dest={dest}"),
        }
    }
}
