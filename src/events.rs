//! Connection events and the sinks that receive them.
//!
//! The endpoint, the connection loop and the command handlers never log
//! directly. They report [`Event`]s to an [`EventSink`]; the server wires in
//! [`TracingSink`], tests use a recording sink.

use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

use crate::record::Record;

/// Something that happened on the endpoint or a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The endpoint bound its listener.
    Listening { addr: SocketAddr },
    /// A connection was accepted and handed to its own task.
    Accepted { peer: SocketAddr },
    /// `accept` failed; the endpoint keeps accepting.
    AcceptFailed { error: String },
    /// A command line was read and trimmed.
    CommandReceived { command: String },
    /// No handler is registered for the command; the connection closes.
    UnregisteredCommand { command: String },
    /// The peer closed the stream while no command was pending.
    StreamClosed,
    /// Reading a command line failed; the connection closes.
    CommandReadFailed { error: String },
    /// A `STRING` payload, already trimmed.
    TextReceived { text: String },
    /// The `STRING` payload could not be read; it is acknowledged anyway.
    TextReadFailed { error: String },
    /// A fully decoded `GOB` record.
    RecordReceived { record: Record },
    /// A handler returned an error; the connection keeps reading commands.
    HandlerFailed { command: String, error: String },
}

/// Receiver for connection events. Shared by every connection task.
pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
}

/// Sink that writes every event as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        match event {
            Event::Listening { addr } => info!(address = %addr, "Listening"),
            Event::Accepted { peer } => debug!(peer = %peer, "New connection"),
            Event::AcceptFailed { error } => error!(error = %error, "Failed to accept connection"),
            Event::CommandReceived { command } => debug!(%command, "Received command"),
            Event::UnregisteredCommand { command } => {
                warn!(%command, "Command is not registered, closing connection")
            }
            Event::StreamClosed => debug!("Reached EOF, closing connection"),
            Event::CommandReadFailed { error } => warn!(error = %error, "Error reading command"),
            Event::TextReceived { text } => info!(%text, "Received STRING message"),
            Event::TextReadFailed { error } => warn!(error = %error, "Cannot read STRING payload"),
            Event::RecordReceived { record } => log_record(&record),
            Event::HandlerFailed { command, error } => {
                warn!(%command, error = %error, "Command handler failed")
            }
        }
    }
}

/// Log the record and each nested record below it.
fn log_record(record: &Record) {
    let mut current = Some(record);
    let mut depth = 0usize;

    while let Some(r) = current {
        info!(
            depth,
            number = r.number,
            text = %r.text,
            counts = ?r.counts,
            data = ?r.data,
            has_child = r.child.is_some(),
            "Received GOB record"
        );
        current = r.child.as_deref();
        depth += 1;
    }
}
