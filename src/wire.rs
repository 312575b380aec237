use std::io;
use std::time::Duration;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::command::CommandError;
use crate::dispatch::Response;
use crate::limits::MAX_LINE_LEN;
use crate::service::EngineHandle;

/// A line went past `MAX_LINE_LEN` before its newline. The rest of it is
/// discarded by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTooLong;

/// `LinesCodec` that reports overlong lines as items instead of stream
/// errors, so `FramedRead` keeps decoding whatever is already buffered.
#[derive(Debug)]
pub struct CommandLines {
    inner: LinesCodec,
}

impl CommandLines {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }

    fn lift(
        frame: Result<Option<String>, LinesCodecError>,
    ) -> io::Result<Option<Result<String, LineTooLong>>> {
        match frame {
            Ok(line) => Ok(line.map(Ok)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Err(LineTooLong))),
            Err(LinesCodecError::Io(e)) => Err(e),
        }
    }
}

impl Decoder for CommandLines {
    type Item = Result<String, LineTooLong>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        Self::lift(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        Self::lift(self.inner.decode_eof(buf))
    }
}

/// Serve one TCP client: one command per line in, one JSON object per line out.
pub async fn process_connection(socket: TcpStream, handle: EngineHandle) -> io::Result<()> {
    socket.set_nodelay(true)?;
    let (reader, writer) = socket.into_split();
    serve_lines(reader, writer, handle).await
}

/// Line loop over any byte pipe (a socket half, or stdin/stdout). Each
/// response is written before the next line is read, so a client sees
/// replies in the order it sent commands.
pub async fn serve_lines<R, W>(reader: R, writer: W, handle: EngineHandle) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(reader, CommandLines::new(MAX_LINE_LEN));
    let mut out = FramedWrite::new(writer, LinesCodec::new());

    while let Some(frame) = lines.next().await {
        let response = match frame? {
            Ok(line) => handle.execute(&line).await.map_err(io::Error::other)?,
            Err(LineTooLong) => {
                debug!("rejecting line longer than {MAX_LINE_LEN} bytes");
                Response::malformed(&CommandError::InvalidArgument {
                    name: "line",
                    value: format!("longer than {MAX_LINE_LEN} bytes"),
                })
            }
        };
        out.send(response.to_json()).await.map_err(codec_err)?;
    }
    Ok(())
}

fn codec_err(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        other => io::Error::other(other),
    }
}

/// Wait until every connection permit is back or `deadline` passes.
/// Returns how many connections were still open.
pub async fn drain_connections(semaphore: &Semaphore, max_connections: usize, deadline: Duration) -> usize {
    let permits = u32::try_from(max_connections).unwrap_or(u32::MAX);
    match tokio::time::timeout(deadline, semaphore.acquire_many(permits)).await {
        Ok(Ok(_all)) => 0,
        Ok(Err(_)) | Err(_) => max_connections.saturating_sub(semaphore.available_permits()),
    }
}
