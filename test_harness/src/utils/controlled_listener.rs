// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use axum::serve::Listener;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal = 0,
    DropAll = 1,
    DropNextResponse = 2,
}

impl Mode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Mode::DropAll,
            2 => Mode::DropNextResponse,
            _ => Mode::Normal,
        }
    }
}

/// Switches the network conditions of a [`ControlledListener`].
#[derive(Clone, Debug)]
pub struct ControlHandle {
    mode: Arc<AtomicU8>,
}

impl Default for ControlHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlHandle {
    pub fn new() -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(Mode::Normal as u8)),
        }
    }

    pub fn set_normal(&self) {
        self.mode.store(Mode::Normal as u8, Ordering::Relaxed);
    }

    /// The server is unreachable: new connections are closed right away and
    /// open ones fail on the next read.
    pub fn set_drop_all(&self) {
        self.mode.store(Mode::DropAll as u8, Ordering::Relaxed);
    }

    /// The next request is handled, but its response never arrives.
    pub fn set_drop_next_response(&self) {
        self.mode
            .store(Mode::DropNextResponse as u8, Ordering::Relaxed);
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Relaxed))
    }
}

/// A TcpStream wrapper which fails or loses data depending on the [`Mode`].
///
/// - In Normal mode: behaves like a regular TcpStream.
/// - In DropAll mode: `poll_read` fails, so the server closes the connection.
/// - In DropNextResponse mode: the first write closes the connection without
///   sending anything and switches back to Normal mode.
pub struct ControlledStream {
    inner: Option<TcpStream>,
    mode: Arc<AtomicU8>,
}

impl ControlledStream {
    fn new(inner: TcpStream, mode: Arc<AtomicU8>) -> Self {
        Self {
            inner: Some(inner),
            mode,
        }
    }

    fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    fn inner(&mut self) -> io::Result<Pin<&mut TcpStream>> {
        self.inner.as_mut().map(Pin::new).ok_or_else(|| {
            io::Error::new(ErrorKind::ConnectionAborted, "connection was dropped")
        })
    }
}

impl AsyncRead for ControlledStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.mode() == Mode::DropAll {
            // hyper closes the connection on a read error
            return Poll::Ready(Err(io::Error::new(
                ErrorKind::ConnectionAborted,
                "server unreachable",
            )));
        }
        me.inner()?.poll_read(cx, buf)
    }
}

impl AsyncWrite for ControlledStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let me = self.get_mut();
        let dropped = me
            .mode
            .compare_exchange(
                Mode::DropNextResponse as u8,
                Mode::Normal as u8,
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok();
        if dropped {
            debug!("Dropping response and connection");
            me.inner = None;
            return Poll::Ready(Ok(buf.len()));
        }
        me.inner()?.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().inner()?.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner() {
            Ok(inner) => inner.poll_shutdown(cx),
            // Already closed
            Err(_) => Poll::Ready(Ok(())),
        }
    }
}

/// A [`Listener`] whose connections can be dropped on demand to simulate an
/// unreachable server.
pub struct ControlledListener {
    listener: TcpListener,
    mode: Arc<AtomicU8>,
}

impl ControlledListener {
    pub async fn bind(addr: SocketAddr) -> io::Result<(Self, ControlHandle)> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener))
    }

    pub fn from_listener(listener: TcpListener) -> (Self, ControlHandle) {
        let handle = ControlHandle::new();

        (
            ControlledListener {
                listener,
                mode: handle.mode.clone(),
            },
            handle,
        )
    }

    pub fn inner(&self) -> &TcpListener {
        &self.listener
    }
}

impl Listener for ControlledListener {
    type Io = ControlledStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if Mode::from_u8(self.mode.load(Ordering::Relaxed)) == Mode::DropAll {
                        // Drop the connection and pretend nothing happened.
                        debug!(%addr, "Dropped connection");
                        drop(stream);
                        continue;
                    }
                    return (ControlledStream::new(stream, self.mode.clone()), addr);
                }
                Err(error) => {
                    // Same backoff as the listener of axum.
                    error!(%error, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.listener.local_addr()
    }
}
