//! Forwarding of child output streams into a chunk channel.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Default buffer size for reading child output.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Capacity of the merged output channel, in chunks.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Copy `reader` into `tx` chunk by chunk until EOF.
///
/// Returns when:
/// - the stream hits EOF
/// - the receiver is dropped
/// - a read error occurs
///
/// Several pumps may share one channel; it closes when the last sender
/// returns.
pub async fn pump_output<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>, label: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("{} pump: EOF", label);
                break;
            }
            Ok(n) => {
                trace!("{} pump: read {} bytes", label, n);
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    debug!("{} pump: receiver dropped", label);
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("{} pump: read error: {}", label, e);
                break;
            }
        }
    }
}
