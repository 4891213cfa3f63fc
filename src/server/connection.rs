//! Per-connection worker: assemble records, commit them, echo the journal

use crate::server::Journal;
use crate::types::{Record, DELIMITER};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Serve one accepted connection until the peer closes it.
///
/// Bytes accumulate in a buffer that is topped up by `buffer_increment`
/// whenever its capacity is exhausted; there is no upper bound, so a peer
/// that streams without ever sending the delimiter grows the buffer
/// indefinitely. Once the most recently read byte is the delimiter the
/// assembled record is appended to the journal and the journal's full
/// contents, as of that append, are written back to the peer. The cycle
/// then repeats on the same connection.
///
/// Partial bytes held when the peer disconnects or a read fails are
/// discarded; nothing reaches the journal without its delimiter. Any error
/// ends only this connection.
pub(crate) async fn serve_connection<S>(mut stream: S, journal: Arc<Journal>, buffer_increment: usize)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(buffer_increment);

    loop {
        if buf.len() == buf.capacity() {
            buf.reserve(buffer_increment);
        }

        match stream.read_buf(&mut buf).await {
            Ok(0) => {
                if !buf.is_empty() {
                    debug!("Peer closed mid-record, discarding {} buffered bytes", buf.len());
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Connection read failed: {}", e);
                break;
            }
        }

        if buf.last() == Some(&DELIMITER) {
            // The delimiter check above means this cannot fail.
            let Ok(record) = Record::from_bytes(buf.split().freeze()) else {
                break;
            };

            let response = journal.append_then_read_all(&record).await;
            if let Err(e) = stream.write_all(&response).await {
                warn!("Echo write failed: {}", e);
                break;
            }
        }
    }
}
