//! Command handlers.
//!
//! Each command is selected by a newline-terminated name on the wire and
//! consumes its own payload from the connection's buffered stream.
//!
//! ## Commands
//! - `STRING`: one text line, answered with a fixed acknowledgment
//! - `GOB`: one binary-encoded [`Record`](crate::record::Record), no reply

pub mod record;
pub mod text;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};

use self::record::codec::CodecError;
use crate::events::EventSink;
use crate::registry::Registry;

/// Command name for the text handler
pub const STRING: &str = "STRING";

/// Command name for the record handler
pub const GOB: &str = "GOB";

/// A buffered, bidirectional connection stream.
pub trait ConnectionIo: AsyncBufRead + AsyncWrite + Unpin + Send {}

impl<T> ConnectionIo for T where T: AsyncBufRead + AsyncWrite + Unpin + Send {}

/// A handler bound to one command name.
///
/// The handler gets exclusive use of the stream until it returns and must
/// consume exactly its own payload.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        io: &mut dyn ConnectionIo,
        events: &dyn EventSink,
    ) -> Result<(), HandlerError>;
}

/// Errors a handler reports back to the connection loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record: {0}")]
    Codec(#[from] CodecError),
}

/// Register the built-in `STRING` and `GOB` commands.
pub fn register_builtin(registry: &Registry) {
    registry.register(STRING, text::TextHandler);
    registry.register(GOB, record::RecordHandler);
}
