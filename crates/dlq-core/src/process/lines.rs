//! Merge stdout and stderr into one line stream.
//!
//! Order is preserved within each stream; interleaving between the two
//! depends on OS buffering and is not deterministic.

use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

const LINE_CHANNEL_CAPACITY: usize = 64;
/// Longer lines are split.
const MAX_LINE_BYTES: u64 = 1024 * 1024;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        })
    }
}

/// One line of tool output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Spawns one reader task per pipe. The receiver yields `None` once both pipes hit EOF.
pub(crate) fn merge<O, E>(stdout: O, stderr: E) -> mpsc::Receiver<OutputLine>
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    tokio::spawn(pump(stdout, Stream::Stdout, tx.clone()));
    tokio::spawn(pump(stderr, Stream::Stderr, tx));
    rx
}

async fn pump<R>(reader: R, stream: Stream, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        let mut limited = (&mut reader).take(MAX_LINE_BYTES);
        match limited.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(OutputLine { stream, text }).await.is_err() {
                    // Receiver gone: the run was cancelled.
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(%stream, "output pipe read failed: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merges_both_streams_preserving_per_stream_order() {
        let out: &[u8] = b"one\r\ntwo\nthree";
        let err: &[u8] = b"e1\n\xffe2\n";
        let mut rx = merge(out, err);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some(line) = rx.recv().await {
            match line.stream {
                Stream::Stdout => stdout.push(line.text),
                Stream::Stderr => stderr.push(line.text),
            }
        }
        assert_eq!(stdout, vec!["one", "two", "three"]);
        assert_eq!(stderr, vec!["e1".to_string(), "\u{fffd}e2".to_string()]);
    }

    #[tokio::test]
    async fn empty_streams_close_immediately() {
        let mut rx = merge(&b""[..], &b""[..]);
        assert!(rx.recv().await.is_none());
    }
}
