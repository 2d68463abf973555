//! Progress-reporting request bodies.

use super::ProgressFn;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

/// Size of the slices handed to the transport.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Percentage of `sent` over `total`, rounded. `None` when the total is
/// unknown (zero).
pub fn progress_percent(sent: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (sent as f64 / total as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

/// Split `contents` into chunks, calling `on_progress` with the running byte
/// count as each chunk is pulled by the consumer.
pub fn progress_stream(
    contents: Bytes,
    on_progress: ProgressFn,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = contents.len() as u64;
    let chunks: Vec<Bytes> = (0..contents.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| contents.slice(start..(start + UPLOAD_CHUNK_SIZE).min(contents.len())))
        .collect();

    let mut sent = 0u64;
    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(sent, total);
        Ok::<Bytes, std::io::Error>(chunk)
    })
}

/// Wrap `contents` as a streaming request body.
pub fn progress_body(contents: Bytes, on_progress: ProgressFn) -> reqwest::Body {
    reqwest::Body::wrap_stream(progress_stream(contents, on_progress))
}
