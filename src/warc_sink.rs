use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::Mutex;
use warc::{RecordBuilder, WarcHeader, WarcWriter};

use crate::error::HarvestError;

/// Single gzip-framed WARC writer shared by every fetch task, guarded by a
/// `tokio::sync::Mutex`. Append-only: never truncates, and the underlying
/// file handle stays open across write failures.
pub struct WarcSink {
    writer: Mutex<WarcWriter<GzEncoder<std::fs::File>>>,
    /// Count of records successfully appended so far. The gzip stream on
    /// disk isn't finalized (and so isn't safely decodable) until the
    /// encoder is dropped, so callers that need to observe progress before
    /// then read this instead of re-opening the archive.
    record_count: AtomicUsize,
}

impl WarcSink {
    /// Opens (or creates) `<name>.warc.gz` for appending.
    pub fn open(name: &str) -> std::io::Result<Self> {
        let path = format!("{name}.warc.gz");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        Ok(Self {
            writer: Mutex::new(WarcWriter::new(encoder)),
            record_count: AtomicUsize::new(0),
        })
    }

    /// Number of records successfully appended so far.
    pub fn record_count(&self) -> usize {
        self.record_count.load(Ordering::SeqCst)
    }

    /// Writes one `response` record: final URL, capture timestamp, `200 OK`
    /// status line, raw headers in the order they were received, raw body
    /// bytes.
    pub async fn write_response(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<(), HarvestError> {
        let http_message = build_http_response_message(headers, body);

        let capture_date = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let record = RecordBuilder::default()
            .header(WarcHeader::WarcType, "response")
            .header(WarcHeader::TargetURI, url)
            .header(WarcHeader::Date, capture_date)
            .header(WarcHeader::ContentType, "application/http;msgtype=response")
            .body(http_message)
            .build()
            .map_err(|e| HarvestError::WriteFailed {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            })?;

        let mut writer = self.writer.lock().await;
        writer
            .write(&record)
            .map(|_| {
                self.record_count.fetch_add(1, Ordering::SeqCst);
            })
            .map_err(|source| HarvestError::WriteFailed { source })
    }
}

/// Raw HTTP response message (status line + headers + blank line + body)
/// that the WARC `response` record's payload wraps.
fn build_http_response_message(headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut message = b"HTTP/1.1 200 OK\r\n".to_vec();
    for (name, value) in headers {
        message.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    message.extend_from_slice(b"\r\n");
    message.extend_from_slice(body);
    message
}
