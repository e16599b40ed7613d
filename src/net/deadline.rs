//! Absolute read/write deadline for streams without keepalive.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{sleep_until, Instant, Sleep};

/// Wraps a stream with a fixed absolute deadline.
///
/// Once the deadline elapses every read and write fails with
/// [`io::ErrorKind::TimedOut`]. The deadline is set at construction and
/// never extended. Shutdown is not gated, so the connection can always be
/// closed cleanly.
#[derive(Debug)]
pub struct DeadlineStream<S> {
    inner: S,
    deadline: Instant,
    timer: Pin<Box<Sleep>>,
}

impl<S> DeadlineStream<S> {
    /// Wrap `inner` with a deadline of now + `timeout`.
    pub fn new(inner: S, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            inner,
            deadline,
            timer: Box::pin(sleep_until(deadline)),
        }
    }

    /// The point in time after which reads and writes fail.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn check_deadline(&mut self, cx: &mut Context<'_>) -> io::Result<()> {
        match self.timer.as_mut().poll(cx) {
            Poll::Ready(()) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "read/write deadline elapsed",
            )),
            Poll::Pending => Ok(()),
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(err) = this.check_deadline(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Err(err) = this.check_deadline(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(err) = this.check_deadline(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test(start_paused = true)]
    async fn io_works_before_deadline() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut stream = DeadlineStream::new(client, Duration::from_secs(60));

        server.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        stream.write_all(b"pong").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[tokio::test(start_paused = true)]
    async fn read_fails_after_deadline() {
        let (client, _server) = tokio::io::duplex(64);
        let mut stream = DeadlineStream::new(client, Duration::from_secs(60));

        // No data arrives; paused time auto-advances to the deadline.
        let mut buf = [0u8; 1];
        let err = stream.read_exact(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn write_fails_after_deadline() {
        let (client, _server) = tokio::io::duplex(64);
        let mut stream = DeadlineStream::new(client, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = stream.write_all(b"late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_now_plus_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let before = Instant::now();
        let stream = DeadlineStream::new(client, Duration::from_secs(60));
        assert_eq!(stream.deadline() - before, Duration::from_secs(60));
    }
}
