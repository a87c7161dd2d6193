//! Receive side of a chat session.
//!
//! Copies bytes arriving from the server to a local output, flushing after
//! every read, until the server closes the connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::server::READ_BUFFER_SIZE;

/// Written to the output once the connection ends.
pub const CONNECTION_CLOSED_NOTICE: &str = "\nConnection closed by server.\n";

/// Reads from the server connection and renders to `output`.
pub struct ReceiveTask<R, W> {
    reader: R,
    output: W,
}

impl<R, W> ReceiveTask<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, output: W) -> Self {
        Self { reader, output }
    }

    /// Spawns the task detached. The handle may be dropped.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Runs until the connection ends. Returns the number of bytes received.
    pub async fn run(mut self) -> u64 {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut received = 0u64;

        loop {
            let n = match self.reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "Receive failed");
                    break;
                }
            };
            received += n as u64;

            let chunk = buf.get(..n).unwrap_or_default();
            let written = async {
                self.output.write_all(chunk).await?;
                self.output.flush().await
            }
            .await;

            if let Err(e) = written {
                debug!(error = %e, "Output closed, stopping receive task");
                return received;
            }
        }

        let _ = self
            .output
            .write_all(CONNECTION_CLOSED_NOTICE.as_bytes())
            .await;
        let _ = self.output.flush().await;

        debug!(bytes = received, "Receive task finished");
        received
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_copies_bytes_then_reports_close() {
        let (mut server, conn) = duplex(256);
        let (output, mut screen) = duplex(256);

        let handle = ReceiveTask::new(conn, output).spawn();

        server.write_all(b"hello\n").await.unwrap();
        server.write_all(b"again\n").await.unwrap();
        drop(server);

        assert_eq!(handle.await.unwrap(), 12);

        let mut shown = String::new();
        screen.read_to_string(&mut shown).await.unwrap();
        assert_eq!(shown, format!("hello\nagain\n{CONNECTION_CLOSED_NOTICE}"));
    }

    #[tokio::test]
    async fn test_stops_when_output_closed() {
        let (mut server, conn) = duplex(256);
        let (output, screen) = duplex(256);
        drop(screen);

        let handle = ReceiveTask::new(conn, output).spawn();
        server.write_all(b"nobody listening").await.unwrap();

        assert_eq!(handle.await.unwrap(), 16);
    }
}
