//! Module `file_ops`
//!
//! Moves file content and directory listings across an established data
//! connection in fixed-size chunks, applying ASCII line-ending conversion
//! when the session asks for it.

use chrono::{DateTime, Local};
use log::{debug, info};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FtpServerError, StorageError, TransferError};
use crate::storage::DirEntry;
use crate::transfer::modes::{AsciiDecoder, AsciiEncoder, TransferType};

/// Which side of a copy failed
#[derive(Debug)]
enum CopyError {
    Source(io::Error),
    Sink(io::Error),
}

/// Line-ending conversion applied while copying
#[derive(Debug)]
enum Conversion {
    None,
    ToNetwork(AsciiEncoder),
    FromNetwork(AsciiDecoder),
}

impl Conversion {
    fn outbound(transfer_type: TransferType) -> Self {
        match transfer_type {
            TransferType::Ascii => Conversion::ToNetwork(AsciiEncoder::default()),
            TransferType::Binary => Conversion::None,
        }
    }

    fn inbound(transfer_type: TransferType) -> Self {
        match transfer_type {
            TransferType::Ascii => Conversion::FromNetwork(AsciiDecoder::default()),
            TransferType::Binary => Conversion::None,
        }
    }
}

async fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    mut conversion: Conversion,
    buffer_size: usize,
) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size];
    let mut converted = Vec::new();
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buffer).await.map_err(CopyError::Source)?;
        if n == 0 {
            break;
        }
        let chunk: &[u8] = match &mut conversion {
            Conversion::None => &buffer[..n],
            Conversion::ToNetwork(encoder) => {
                converted.clear();
                encoder.encode(&buffer[..n], &mut converted);
                &converted
            }
            Conversion::FromNetwork(decoder) => {
                converted.clear();
                decoder.decode(&buffer[..n], &mut converted);
                &converted
            }
        };
        writer.write_all(chunk).await.map_err(CopyError::Sink)?;
        written += chunk.len() as u64;
    }

    if let Conversion::FromNetwork(decoder) = &mut conversion {
        converted.clear();
        decoder.finish(&mut converted);
        writer.write_all(&converted).await.map_err(CopyError::Sink)?;
        written += converted.len() as u64;
    }

    writer.flush().await.map_err(CopyError::Sink)?;
    Ok(written)
}

/// Send a stored file to the client. Returns the bytes put on the wire.
///
/// Read failures on the file are local errors; write failures on the data
/// connection abort the transfer.
pub async fn send_file<R, W>(
    file: &mut R,
    data_stream: &mut W,
    transfer_type: TransferType,
    buffer_size: usize,
) -> Result<u64, FtpServerError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    match copy_chunked(file, data_stream, Conversion::outbound(transfer_type), buffer_size).await {
        Ok(n) => {
            info!("Sent {} bytes in {} mode", n, transfer_type);
            Ok(n)
        }
        Err(CopyError::Source(e)) => Err(StorageError::Local(e).into()),
        Err(CopyError::Sink(e)) => Err(TransferError::Io(e).into()),
    }
}

/// Receive a file from the client into storage. Returns the bytes stored.
pub async fn receive_file<R, W>(
    data_stream: &mut R,
    file: &mut W,
    transfer_type: TransferType,
    buffer_size: usize,
) -> Result<u64, FtpServerError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let result = copy_chunked(data_stream, file, Conversion::inbound(transfer_type), buffer_size).await;
    match result {
        Ok(n) => {
            file.shutdown().await.map_err(StorageError::Local)?;
            info!("Received {} bytes in {} mode", n, transfer_type);
            Ok(n)
        }
        Err(CopyError::Source(e)) => Err(TransferError::Io(e).into()),
        Err(CopyError::Sink(e)) => Err(StorageError::Local(e).into()),
    }
}

/// Directory listing flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `ls -l` style lines (LIST)
    Long,
    /// Bare names (NLST)
    NamesOnly,
}

/// Format one `ls -l` style listing line without the line terminator.
pub fn format_list_entry(entry: &DirEntry) -> String {
    let modified: DateTime<Local> = entry.modified().into();
    let permissions = if entry.is_directory() {
        "drwxr-xr-x"
    } else {
        "-rw-r--r--"
    };
    format!(
        "{} 1 ftp ftp {:>12} {} {}",
        permissions,
        entry.size(),
        modified.format("%b %d %H:%M"),
        entry.name
    )
}

/// Render a listing with CRLF line endings.
pub fn render_listing(entries: &[DirEntry], format: ListFormat) -> String {
    let mut out = String::new();
    for entry in entries {
        match format {
            ListFormat::Long => out.push_str(&format_list_entry(entry)),
            ListFormat::NamesOnly => out.push_str(&entry.name),
        }
        out.push_str("\r\n");
    }
    out
}

/// Write a rendered listing to the data connection.
pub async fn send_listing<W>(
    entries: &[DirEntry],
    format: ListFormat,
    data_stream: &mut W,
) -> Result<u64, FtpServerError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let listing = render_listing(entries, format);
    data_stream
        .write_all(listing.as_bytes())
        .await
        .map_err(TransferError::Io)?;
    data_stream.flush().await.map_err(TransferError::Io)?;
    debug!("Sent listing of {} entries", entries.len());
    Ok(listing.len() as u64)
}
