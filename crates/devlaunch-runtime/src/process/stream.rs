//! Byte-oriented line streams over child output (non-UTF8-safe).
//!
//! Node tooling can emit non-UTF8 bytes (and ANSI colour codes) on stdout/stderr.
//! Using `BufReader::lines()` would end the stream on the first invalid byte, so
//! lines are read as bytes and decoded lossily.

use async_stream::stream;
use futures_util::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

/// Turn a readable pipe into a stream of lines with trailing `\n`/`\r\n` removed.
///
/// Blocks on the read rather than polling; the stream ends on EOF or the first
/// read error.
pub fn line_stream(
    reader: impl AsyncRead + Unpin + Send + 'static,
    label: &'static str,
) -> impl Stream<Item = String> + Send + 'static {
    stream! {
        let mut reader = BufReader::new(reader);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    yield String::from_utf8_lossy(&buf).into_owned();
                }
                Err(e) => {
                    debug!(stream = %label, error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(stream = %label, "output reader reached EOF");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_lines_are_split_and_trimmed() {
        let input: &[u8] = b"first\r\nsecond\nthird";
        let lines: Vec<String> = line_stream(input, "stdout").collect().await;
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_end_stream() {
        let input: &[u8] = b"ok\n\xff\xfe bad\nafter\n";
        let lines: Vec<String> = line_stream(input, "stderr").collect().await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "after");
    }
}
