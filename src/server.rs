//! TCP endpoint for line-oriented commands.
//!
//! Accepts connections, reads command lines, and dispatches each one to the
//! handler registered for it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info_span, Instrument};

use crate::commands::ConnectionIo;
use crate::events::{Event, EventSink};
use crate::registry::Registry;

/// Endpoint errors
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("unable to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to read local address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Why a connection loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream between commands.
    Eof,
    /// Reading a command line failed.
    ReadFailed,
    /// The command has no registered handler.
    Unregistered(String),
}

/// Listening endpoint that owns the command registry
pub struct Endpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    events: Arc<dyn EventSink>,
}

impl Endpoint {
    /// Bind the listener. Failing to bind is the only fatal endpoint error.
    pub async fn bind(addr: &str, events: Arc<dyn EventSink>) -> Result<Self, EndpointError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EndpointError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(EndpointError::LocalAddr)?;

        events.record(Event::Listening { addr: local_addr });

        Ok(Endpoint {
            listener,
            local_addr,
            registry: Arc::new(Registry::new()),
            events,
        })
    }

    /// Shared handle to the registry, usable after [`Endpoint::run`] starts.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, one task per connection.
    ///
    /// Accept errors are reported and the loop keeps going. Spawned tasks are
    /// not tracked; they run until their peer disconnects.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    self.events.record(Event::Accepted { peer });

                    let registry = Arc::clone(&self.registry);
                    let events = Arc::clone(&self.events);

                    tokio::spawn(
                        async move {
                            handle_stream(stream, &registry, events.as_ref()).await;
                        }
                        .instrument(info_span!("conn", peer = %peer)),
                    );
                }
                Err(e) => {
                    self.events.record(Event::AcceptFailed {
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Serve one accepted socket; the socket is closed when this returns.
async fn handle_stream(
    stream: TcpStream,
    registry: &Registry,
    events: &dyn EventSink,
) -> CloseReason {
    let mut io = BufStream::new(stream);
    serve_connection(&mut io, registry, events).await
}

/// Run the command loop on one connection.
///
/// Reads a command line, dispatches it, and repeats until the peer closes the
/// stream, a read fails, or a command has no handler. A partial command line
/// at end of stream is dropped. Handler errors are reported and do not end the
/// loop.
pub async fn serve_connection(
    io: &mut dyn ConnectionIo,
    registry: &Registry,
    events: &dyn EventSink,
) -> CloseReason {
    let mut line = String::with_capacity(64);

    loop {
        line.clear();

        match io.read_line(&mut line).await {
            // A line without its delimiter means the stream ended mid-command.
            Ok(_) if !line.ends_with('\n') => {
                events.record(Event::StreamClosed);
                return CloseReason::Eof;
            }
            Ok(_) => {}
            Err(e) => {
                events.record(Event::CommandReadFailed {
                    error: e.to_string(),
                });
                return CloseReason::ReadFailed;
            }
        }

        let command = line.trim();
        events.record(Event::CommandReceived {
            command: command.to_string(),
        });

        let Some(handler) = registry.lookup(command) else {
            events.record(Event::UnregisteredCommand {
                command: command.to_string(),
            });
            return CloseReason::Unregistered(command.to_string());
        };

        if let Err(e) = handler.handle(&mut *io, events).await {
            events.record(Event::HandlerFailed {
                command: command.to_string(),
                error: e.to_string(),
            });
        }
    }
}
