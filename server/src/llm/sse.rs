//! Provider-side SSE plumbing shared by both streaming clients.
//!
//! Both providers answer a streaming request with an SSE body. This module
//! turns that body into a [`ChunkStream`] given a per-provider record parser,
//! and maps HTTP status codes onto [`LlmError`] before streaming starts.

use frames::{Record, RecordDecoder};
use futures::StreamExt;

use super::types::{ChunkStream, LlmError, StreamStep};

/// Reject non-success responses, reading the body for diagnostics.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        return Err(LlmError::RateLimited(body));
    }
    Err(LlmError::ApiResponse { status: status.as_u16(), body })
}

/// Convert an SSE response body into text chunks using `parse` per record.
///
/// The stream ends at the first [`StreamStep::End`], the first error, or the
/// end of the body, whichever comes first.
pub(crate) fn record_stream<F>(response: reqwest::Response, mut parse: F) -> ChunkStream
where
    F: FnMut(&Record) -> Result<StreamStep, LlmError> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = response.bytes_stream();
        let mut decoder = RecordDecoder::new();
        let mut body_done = false;

        while !body_done {
            let records = match body.next().await {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => {
                    yield Err(LlmError::from_transport(&e));
                    return;
                }
                None => {
                    body_done = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for raw in records {
                match parse(&Record::parse(&raw)) {
                    Ok(StreamStep::Chunk(text)) => yield Ok(text),
                    Ok(StreamStep::Skip) => {}
                    Ok(StreamStep::End) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    })
}
