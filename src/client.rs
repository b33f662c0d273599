//! Client driver.
//!
//! Opens one connection, sends a `STRING` request and waits for its
//! acknowledgment, then sends a `GOB` request carrying the demonstration
//! record. Any failure aborts the sequence.

use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::commands::record::codec::{self, CodecError};
use crate::commands::{ConnectionIo, GOB, STRING};
use crate::record::Record;

/// Text sent with the `STRING` request
pub const TEXT_PAYLOAD: &str = "Additional data. \n";

/// Client errors, each naming the step that failed
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("dialing {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{step} failed: {source}")]
    Io {
        step: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("encoding record failed: {0}")]
    Encode(#[from] CodecError),

    #[error("server closed the connection before replying")]
    NoReply,
}

/// Extension to tag an I/O result with the step it belongs to.
trait StepExt<T> {
    fn step(self, step: &'static str) -> Result<T, ClientError>;
}

impl<T> StepExt<T> for io::Result<T> {
    fn step(self, step: &'static str) -> Result<T, ClientError> {
        self.map_err(|source| ClientError::Io { step, source })
    }
}

/// Dial `addr` and run the demonstration exchange.
pub async fn run(addr: &str) -> Result<(), ClientError> {
    info!(address = %addr, "Dial");
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    let mut io = BufStream::new(stream);

    let record = Record::demo();
    let reply = exchange(&mut io, &record).await?;
    info!(reply = %reply.trim_end(), "STRING request: got a response");

    Ok(())
}

/// Send the `STRING` request, read the reply, then send `record` as `GOB`.
///
/// Returns the reply line to the `STRING` request.
pub async fn exchange(io: &mut dyn ConnectionIo, record: &Record) -> Result<String, ClientError> {
    debug!("Send the STRING request");
    io.write_all(format!("{STRING}\n").as_bytes())
        .await
        .step("sending the STRING request")?;
    io.write_all(TEXT_PAYLOAD.as_bytes())
        .await
        .step("sending the STRING payload")?;
    io.flush().await.step("flushing the STRING request")?;

    let mut reply = String::new();
    let n = io.read_line(&mut reply).await.step("reading the reply")?;
    if n == 0 {
        return Err(ClientError::NoReply);
    }

    debug!(?record, "Send a record as GOB");
    let frame = codec::encode_frame(record)?;
    io.write_all(format!("{GOB}\n").as_bytes())
        .await
        .step("sending the GOB request")?;
    io.write_all(&frame).await.step("sending the GOB payload")?;
    io.flush().await.step("flushing the GOB request")?;

    Ok(reply)
}
