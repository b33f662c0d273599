//! Text command handler.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use crate::commands::{CommandHandler, ConnectionIo, HandlerError};
use crate::events::{Event, EventSink};

/// Acknowledgment line sent after every text payload
pub const ACK: &[u8] = b"Thank you. \n";

/// Handles `STRING`: reads one line, reports it, replies with [`ACK`].
///
/// A payload that cannot be read is reported and still acknowledged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextHandler;

#[async_trait]
impl CommandHandler for TextHandler {
    async fn handle(
        &self,
        io: &mut dyn ConnectionIo,
        events: &dyn EventSink,
    ) -> Result<(), HandlerError> {
        let mut line = String::new();
        match io.read_line(&mut line).await {
            Ok(0) => events.record(Event::TextReadFailed {
                error: "stream ended before payload".to_string(),
            }),
            Ok(_) => events.record(Event::TextReceived {
                text: line.trim().to_string(),
            }),
            Err(e) => events.record(Event::TextReadFailed {
                error: e.to_string(),
            }),
        }

        io.write_all(ACK).await?;
        io.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingSink;
    use tokio::io::BufStream;

    #[tokio::test]
    async fn test_text_is_trimmed_and_acknowledged() {
        let mock = tokio_test::io::Builder::new()
            .read(b"  Hello there \n")
            .write(ACK)
            .build();
        let mut io = BufStream::new(mock);
        let sink = RecordingSink::default();

        TextHandler.handle(&mut io, &sink).await.unwrap();

        assert_eq!(sink.texts(), vec!["Hello there".to_string()]);
    }

    #[tokio::test]
    async fn test_reads_only_one_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"first\nGOB\n")
            .write(ACK)
            .build();
        let mut io = BufStream::new(mock);
        let sink = RecordingSink::default();

        TextHandler.handle(&mut io, &sink).await.unwrap();

        let mut rest = String::new();
        io.read_line(&mut rest).await.unwrap();
        assert_eq!(rest, "GOB\n");
        assert_eq!(sink.texts(), vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let (client, server) = tokio::io::duplex(64);
        let (mut client_rd, mut client_wr) = tokio::io::split(client);
        client_wr.write_all(b"no newline").await.unwrap();
        client_wr.shutdown().await.unwrap();

        let mut io = BufStream::new(server);
        let sink = RecordingSink::default();
        TextHandler.handle(&mut io, &sink).await.unwrap();

        let mut reply = vec![0u8; ACK.len()];
        tokio::io::AsyncReadExt::read_exact(&mut client_rd, &mut reply).await.unwrap();
        assert_eq!(reply, ACK);
        assert_eq!(sink.texts(), vec!["no newline".to_string()]);
    }

    #[tokio::test]
    async fn test_eof_before_payload_still_acknowledged() {
        let (client, server) = tokio::io::duplex(64);
        let (mut client_rd, mut client_wr) = tokio::io::split(client);
        client_wr.shutdown().await.unwrap();

        let mut io = BufStream::new(server);
        let sink = RecordingSink::default();
        TextHandler.handle(&mut io, &sink).await.unwrap();

        let mut reply = vec![0u8; ACK.len()];
        tokio::io::AsyncReadExt::read_exact(&mut client_rd, &mut reply).await.unwrap();
        assert_eq!(reply, ACK);
        assert!(sink.texts().is_empty());
        assert_eq!(
            sink.events(),
            vec![Event::TextReadFailed {
                error: "stream ended before payload".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_still_acknowledged() {
        let mock = tokio_test::io::Builder::new()
            .read(b"\xFF\xFE\n")
            .write(ACK)
            .build();
        let mut io = BufStream::new(mock);
        let sink = RecordingSink::default();

        TextHandler.handle(&mut io, &sink).await.unwrap();

        assert!(sink.texts().is_empty());
        assert!(matches!(
            sink.events().as_slice(),
            [Event::TextReadFailed { .. }]
        ));
    }
}
