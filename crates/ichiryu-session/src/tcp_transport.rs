use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::irc_wire::{event_from_line, parse_irc_line, render_command};
use crate::transport::{Connection, OutboundCommand, Transport, TransportEvent};

/// Longest inbound line accepted, terminator included.
const MAX_LINE_BYTES: usize = 8 * 1024;

/// Plain-text IRC over TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to connect to {}:{}", self.host, self.port))?;
        let (reader, writer) = stream.into_split();
        tracing::debug!(host = %self.host, port = self.port, "tcp connection established");
        Ok(Box::new(TcpConnection {
            reader: BufReader::new(reader),
            writer,
            pending: Vec::new(),
        }))
    }
}

struct TcpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Bytes of a partially received line; kept across cancelled reads.
    pending: Vec<u8>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        loop {
            let remaining = (MAX_LINE_BYTES + 1).saturating_sub(self.pending.len()) as u64;
            let read = (&mut self.reader)
                .take(remaining)
                .read_until(b'\n', &mut self.pending)
                .await
                .context("failed reading from IRC server")?;
            if self.pending.len() > MAX_LINE_BYTES && !self.pending.ends_with(b"\n") {
                self.pending.clear();
                bail!("IRC server sent a line longer than {MAX_LINE_BYTES} bytes");
            }
            if read == 0 && self.pending.is_empty() {
                return Ok(None);
            }
            if read != 0 && !self.pending.ends_with(b"\n") {
                continue;
            }
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw);
            tracing::trace!(line = %line.trim_end(), "irc <-");
            if let Some(parsed) = parse_irc_line(&line) {
                return Ok(Some(event_from_line(parsed)));
            }
        }
    }

    async fn send(&mut self, command: OutboundCommand) -> Result<()> {
        let line = render_command(&command);
        tracing::trace!(line = %line, "irc ->");
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .context("failed writing to IRC server")?;
        self.writer
            .flush()
            .await
            .context("failed flushing IRC connection")
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::{TcpTransport, MAX_LINE_BYTES};
    use crate::transport::{OutboundCommand, Transport, TransportEvent};

    #[tokio::test]
    async fn integration_tcp_transport_reads_events_and_writes_crlf_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let (reader, mut writer) = socket.into_split();
            writer
                .write_all(b"PING :abc\r\n\r\n:srv 001 ichiryu :hi\xff\r\n:srv NOTICE * :partial")
                .await
                .expect("write");
            drop(writer);
            let mut lines = BufReader::new(reader).lines();
            lines.next_line().await.expect("read").expect("line")
        });

        let mut connection = TcpTransport::new("127.0.0.1", port)
            .connect()
            .await
            .expect("connect");
        assert_eq!(
            connection.next_event().await.expect("event"),
            Some(TransportEvent::Ping {
                token: "abc".to_string()
            })
        );
        connection
            .send(OutboundCommand::Pong("abc".to_string()))
            .await
            .expect("send");
        assert_eq!(
            connection.next_event().await.expect("event"),
            Some(TransportEvent::Registered)
        );
        assert_eq!(
            connection.next_event().await.expect("event"),
            Some(TransportEvent::Other)
        );
        assert_eq!(connection.next_event().await.expect("event"), None);

        assert_eq!(server.await.expect("server task"), "PONG :abc");
    }

    #[tokio::test]
    async fn regression_tcp_transport_rejects_unterminated_oversized_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            socket
                .write_all(&vec![b'a'; MAX_LINE_BYTES * 2])
                .await
                .expect("write");
            let _ = done_rx.await;
        });

        let mut connection = TcpTransport::new("127.0.0.1", port)
            .connect()
            .await
            .expect("connect");
        let error = connection
            .next_event()
            .await
            .expect_err("oversized line should fail the read");
        assert!(error.to_string().contains("longer than 8192 bytes"));

        let _ = done_tx.send(());
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn regression_tcp_transport_reports_refused_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let error = TcpTransport::new("127.0.0.1", port)
            .connect()
            .await
            .err()
            .expect("connection should fail");
        assert!(error.to_string().contains("failed to connect to 127.0.0.1"));
    }
}
