//! Record command handler.

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::codec::{self, FRAME_HEADER_LEN};
use crate::commands::{CommandHandler, ConnectionIo, HandlerError};
use crate::events::{Event, EventSink};
use crate::record::Record;

/// Handles `GOB`: decodes one record frame and reports it. Sends no reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordHandler;

#[async_trait]
impl CommandHandler for RecordHandler {
    async fn handle(
        &self,
        io: &mut dyn ConnectionIo,
        events: &dyn EventSink,
    ) -> Result<(), HandlerError> {
        let record = read_frame(io).await?;
        events.record(Event::RecordReceived { record });
        Ok(())
    }
}

/// Read exactly one frame from the stream and decode it.
///
/// The length prefix is checked before the body is read, so an oversized
/// frame costs only the 4 header bytes.
async fn read_frame(io: &mut dyn ConnectionIo) -> Result<Record, HandlerError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    io.read_exact(&mut header).await?;
    let len = codec::body_len(header)?;

    let mut body = vec![0u8; len];
    io.read_exact(&mut body).await?;

    Ok(codec::decode_body(&body)?)
}
