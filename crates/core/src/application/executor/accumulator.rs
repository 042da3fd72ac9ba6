// Output accumulation with the buffer-limit watchdog

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use super::constants::READ_CHUNK_SIZE;
use crate::domain::StreamName;

/// Everything captured from one stream
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct StreamCapture {
    pub bytes: Vec<u8>,
    pub overflowed: bool,
}

/// Read `reader` to end-of-stream, appending in arrival order
///
/// When the accumulated size exceeds `cap`, the capture is truncated to `cap`
/// bytes, `stream` is sent once on `overflow_tx`, and the rest of the stream
/// is drained and discarded. A read error ends the capture early.
///
/// Setting `stop` abandons the stream with whatever was captured so far.
/// Descendants of a killed process can hold the pipe open indefinitely, so
/// end-of-stream cannot be waited for once the process was killed.
pub(crate) async fn drain<R>(
    mut reader: R,
    stream: StreamName,
    cap: Option<usize>,
    overflow_tx: mpsc::UnboundedSender<StreamName>,
    mut stop: watch::Receiver<bool>,
) -> StreamCapture
where
    R: AsyncRead + Unpin,
{
    let mut capture = StreamCapture::default();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = tokio::select! {
            read = reader.read(&mut chunk) => read,
            _ = stop_requested(&mut stop) => {
                debug!(stream = %stream, bytes = capture.bytes.len(), "Stream abandoned");
                break;
            }
        };

        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(stream = %stream, error = %e, "Read failed; ending capture");
                break;
            }
        };

        if capture.overflowed {
            continue;
        }

        capture.bytes.extend_from_slice(&chunk[..n]);
        trace!(stream = %stream, bytes = capture.bytes.len(), "Captured output");

        if let Some(cap) = cap {
            if capture.bytes.len() > cap {
                capture.bytes.truncate(cap);
                capture.overflowed = true;
                debug!(stream = %stream, cap, "maxBuffer exceeded");
                // Receiver is gone once the coordinator stopped listening
                let _ = overflow_tx.send(stream);
            }
        }
    }

    capture
}

/// Resolves once `stop` is set; never, if the sender is gone without setting it
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
