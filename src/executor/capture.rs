//! Concurrent capture of a child's stdout and stderr
//!
//! Each stream gets its own drain task. Both are symmetric: neither is
//! drained inline while the other runs in the background, so a full pipe on
//! one side can never stall the other.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::{RunError, StreamName};

/// Read size for each drain iteration
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Everything one drain produced
#[derive(Debug, Default)]
pub struct StreamCapture {
    pub bytes: Vec<u8>,
    /// First I/O failure seen while reading or mirroring
    pub error: Option<io::Error>,
}

impl StreamCapture {
    fn failed(error: io::Error) -> Self {
        Self {
            bytes: Vec::new(),
            error: Some(error),
        }
    }

    /// Captured bytes, or the capture error for `stream`
    pub fn into_result(self, stream: StreamName) -> Result<Vec<u8>, RunError> {
        match self.error {
            Some(source) => Err(RunError::StreamCapture { stream, source }),
            None => Ok(self.bytes),
        }
    }
}

/// Drain `reader` to EOF, optionally copying every chunk to `mirror`
///
/// A mirror failure is recorded and mirroring stops, but reading continues so
/// the writer on the other end of the pipe is never blocked.
pub async fn drain_stream<R, W>(mut reader: R, mut mirror: Option<W>) -> StreamCapture
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut capture = StreamCapture::default();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                capture.error.get_or_insert(e);
                break;
            }
        };

        capture.bytes.extend_from_slice(&chunk[..n]);

        if let Some(sink) = mirror.as_mut() {
            if let Err(e) = mirror_chunk(sink, &chunk[..n]).await {
                tracing::warn!("Stopped mirroring command output: {}", e);
                capture.error.get_or_insert(e);
                mirror = None;
            }
        }
    }

    capture
}

async fn mirror_chunk<W: AsyncWrite + Unpin>(sink: &mut W, chunk: &[u8]) -> io::Result<()> {
    sink.write_all(chunk).await?;
    sink.flush().await
}

async fn drain_optional<R, W>(reader: Option<R>, mirror: Option<W>) -> StreamCapture
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match reader {
        Some(reader) => drain_stream(reader, mirror).await,
        None => StreamCapture::default(),
    }
}

/// The two running drain tasks
///
/// Dropping an unjoined capture aborts both drains.
#[derive(Debug)]
pub struct OutputCapture {
    stdout: JoinHandle<StreamCapture>,
    stderr: JoinHandle<StreamCapture>,
}

impl OutputCapture {
    /// Start draining, mirroring to the host's stdout/stderr when `mirror` is set
    pub fn start<O, E>(stdout: Option<O>, stderr: Option<E>, mirror: bool) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        Self::start_with(
            stdout,
            stderr,
            mirror.then(tokio::io::stdout),
            mirror.then(tokio::io::stderr),
        )
    }

    /// Start draining into explicit mirror sinks
    pub fn start_with<O, E, WO, WE>(
        stdout: Option<O>,
        stderr: Option<E>,
        stdout_mirror: Option<WO>,
        stderr_mirror: Option<WE>,
    ) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
        WO: AsyncWrite + Unpin + Send + 'static,
        WE: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            stdout: tokio::spawn(drain_optional(stdout, stdout_mirror)),
            stderr: tokio::spawn(drain_optional(stderr, stderr_mirror)),
        }
    }

    /// Wait until both streams reached EOF or failed
    pub async fn join(mut self) -> (StreamCapture, StreamCapture) {
        tokio::join!(join_drain(&mut self.stdout), join_drain(&mut self.stderr))
    }
}

async fn join_drain(handle: &mut JoinHandle<StreamCapture>) -> StreamCapture {
    match handle.await {
        Ok(capture) => capture,
        Err(e) => StreamCapture::failed(io::Error::other(format!("drain task failed: {}", e))),
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        self.stdout.abort();
        self.stderr.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_drain_without_mirror() {
        let reader = Builder::new().read(b"hello ").read(b"world\n").build();

        let capture = drain_stream(reader, None::<DuplexStream>).await;
        assert_eq!(capture.bytes, b"hello world\n");
        assert!(capture.error.is_none());
    }

    #[tokio::test]
    async fn test_drain_mirrors_in_order() {
        let reader = Builder::new().read(b"abc").read(b"def").build();
        let mirror = Builder::new().write(b"abc").write(b"def").build();

        let capture = drain_stream(reader, Some(mirror)).await;
        assert_eq!(capture.bytes, b"abcdef");
        assert!(capture.error.is_none());
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_draining() {
        let reader = Builder::new().read(b"first").read(b"second").build();
        let mirror = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();

        let capture = drain_stream(reader, Some(mirror)).await;
        assert_eq!(capture.bytes, b"firstsecond");
        assert_eq!(
            capture.error.map(|e| e.kind()),
            Some(io::ErrorKind::BrokenPipe)
        );
    }

    #[tokio::test]
    async fn test_read_failure_is_recorded() {
        let reader = Builder::new()
            .read(b"partial")
            .read_error(io::Error::other("boom"))
            .build();

        let capture = drain_stream(reader, None::<DuplexStream>).await;
        assert_eq!(capture.bytes, b"partial");
        assert!(capture.error.is_some());

        let err = capture.into_result(StreamName::Stdout).unwrap_err();
        assert!(matches!(
            err,
            RunError::StreamCapture {
                stream: StreamName::Stdout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_one_failing_stream_does_not_affect_other() {
        let stdout = Builder::new().read_error(io::Error::other("boom")).build();
        let stderr = Builder::new().read(b"still here").build();

        let capture = OutputCapture::start(Some(stdout), Some(stderr), false);
        let (stdout, stderr) = capture.join().await;

        assert!(stdout.error.is_some());
        assert!(stderr.error.is_none());
        assert_eq!(stderr.bytes, b"still here");
    }

    #[tokio::test]
    async fn test_start_with_mirrors_each_stream() {
        let (out_sink, mut out_seen) = tokio::io::duplex(1024);
        let (err_sink, mut err_seen) = tokio::io::duplex(1024);

        let capture = OutputCapture::start_with(
            Some(&b"to stdout"[..]),
            Some(&b"to stderr"[..]),
            Some(out_sink),
            Some(err_sink),
        );
        let (stdout, stderr) = capture.join().await;
        assert_eq!(stdout.bytes, b"to stdout");
        assert_eq!(stderr.bytes, b"to stderr");

        let mut mirrored = Vec::new();
        out_seen.read_to_end(&mut mirrored).await.unwrap();
        assert_eq!(mirrored, b"to stdout");

        mirrored.clear();
        err_seen.read_to_end(&mut mirrored).await.unwrap();
        assert_eq!(mirrored, b"to stderr");
    }

    #[tokio::test]
    async fn test_missing_pipes_capture_nothing() {
        let capture = OutputCapture::start(None::<&[u8]>, None::<&[u8]>, false);
        let (stdout, stderr) = capture.join().await;

        assert!(stdout.bytes.is_empty() && stdout.error.is_none());
        assert!(stderr.bytes.is_empty() && stderr.error.is_none());
    }
}
