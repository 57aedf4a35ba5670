//! Control connection I/O
//!
//! Bounded line reading from the client and reply writing back to it.

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::error::SessionError;
use crate::protocol::responses::Reply;

/// One unit read from the control connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLine {
    /// A complete line without its terminator
    Command(String),
    /// The line exceeded the length limit and was discarded
    TooLong,
    /// The line was not valid UTF-8
    InvalidEncoding,
    /// The client closed the connection
    Closed,
}

/// Reads CRLF (or bare LF) terminated command lines.
#[derive(Debug)]
pub struct ControlReader<R> {
    reader: BufReader<R>,
    max_length: usize,
}

impl<R: AsyncRead + Unpin> ControlReader<R> {
    pub fn new(reader: R, max_length: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_length,
        }
    }

    /// Read the next line. Lines longer than the limit are consumed up to
    /// their terminator and reported as `TooLong`. A partial line at end of
    /// stream counts as a close.
    pub async fn read_line(&mut self) -> Result<ControlLine, SessionError> {
        let mut line = Vec::new();
        let mut overflow = false;

        loop {
            let (used, complete) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(ControlLine::Closed);
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(idx) => {
                        if !overflow {
                            line.extend_from_slice(&available[..idx]);
                        }
                        (idx + 1, true)
                    }
                    None => {
                        if !overflow {
                            line.extend_from_slice(available);
                        }
                        (available.len(), false)
                    }
                }
            };
            self.reader.consume(used);

            // +1 leaves room for a CR that belongs to the terminator.
            if line.len() > self.max_length + 1 {
                overflow = true;
                line.clear();
            }
            if complete {
                break;
            }
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if overflow || line.len() > self.max_length {
            return Ok(ControlLine::TooLong);
        }
        match String::from_utf8(line) {
            Ok(text) => Ok(ControlLine::Command(text)),
            Err(_) => Ok(ControlLine::InvalidEncoding),
        }
    }

    /// Resolves once the client has closed its side of the connection.
    ///
    /// Nothing is consumed. If the client already sent more input, this
    /// stays pending; that input is read by the next `read_line`.
    pub async fn closed(&mut self) {
        match self.reader.fill_buf().await {
            Ok(available) if !available.is_empty() => std::future::pending::<()>().await,
            _ => {}
        }
    }
}

/// Writes replies to the client.
#[derive(Debug)]
pub struct ControlWriter<W> {
    writer: W,
    session_id: Uuid,
}

impl<W: AsyncWrite + Unpin> ControlWriter<W> {
    pub fn new(writer: W, session_id: Uuid) -> Self {
        Self { writer, session_id }
    }

    pub async fn send(&mut self, reply: &Reply) -> Result<(), SessionError> {
        debug!("[{}] Sending: {}", self.session_id, reply);
        self.writer.write_all(reply.to_wire().as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::responses::ReplyCode;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    async fn lines(input: &[u8], max: usize) -> Vec<ControlLine> {
        let mut reader = ControlReader::new(input, max);
        let mut out = Vec::new();
        loop {
            let line = reader.read_line().await.unwrap();
            let done = line == ControlLine::Closed;
            out.push(line);
            if done {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn splits_lines_and_strips_terminators() {
        let got = lines(b"USER bob\r\nNOOP\nPWD\r\n", 64).await;
        assert_eq!(
            got,
            vec![
                ControlLine::Command("USER bob".into()),
                ControlLine::Command("NOOP".into()),
                ControlLine::Command("PWD".into()),
                ControlLine::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn overlong_line_is_discarded_entirely() {
        let mut input = vec![b'A'; 100];
        input.extend_from_slice(b"\r\nNOOP\r\n");
        let got = lines(&input, 16).await;
        assert_eq!(
            got,
            vec![
                ControlLine::TooLong,
                ControlLine::Command("NOOP".into()),
                ControlLine::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn line_at_limit_is_accepted() {
        let got = lines(b"ABCDEFGH\r\n", 8).await;
        assert_eq!(got[0], ControlLine::Command("ABCDEFGH".into()));
        let got = lines(b"ABCDEFGHI\r\n", 8).await;
        assert_eq!(got[0], ControlLine::TooLong);
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported() {
        let got = lines(b"USER \xff\xfe\r\nNOOP\r\n", 64).await;
        assert_eq!(got[0], ControlLine::InvalidEncoding);
        assert_eq!(got[1], ControlLine::Command("NOOP".into()));
    }

    #[tokio::test]
    async fn partial_line_at_eof_is_close() {
        let got = lines(b"NOO", 64).await;
        assert_eq!(got, vec![ControlLine::Closed]);
    }

    #[tokio::test]
    async fn closed_waits_for_eof_without_consuming() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = ControlReader::new(server, 64);
        client.write_all(b"NOOP\r\n").await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(100), reader.closed()).await;
        assert!(waited.is_err());
        assert_eq!(
            reader.read_line().await.unwrap(),
            ControlLine::Command("NOOP".into())
        );

        drop(client);
        tokio::time::timeout(Duration::from_secs(5), reader.closed())
            .await
            .unwrap();
        assert_eq!(reader.read_line().await.unwrap(), ControlLine::Closed);
    }

    #[tokio::test]
    async fn writer_emits_crlf_replies() {
        let (client, server) = tokio::io::duplex(64);
        let mut writer = ControlWriter::new(server, Uuid::new_v4());
        writer
            .send(&Reply::new(ReplyCode::CommandOkay, "OK"))
            .await
            .unwrap();
        drop(writer);
        let mut out = String::new();
        let mut client = client;
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "200 OK\r\n");
    }
}
