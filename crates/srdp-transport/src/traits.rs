use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// Byte transport consumed by an SRDP channel.
///
/// `recv` returning `Ok(0)` means "no data this cycle": read timeouts and
/// `WouldBlock` are folded into it so a poll loop can simply try again.
/// Real failures come back as `Err`.
///
/// `send` hands over one complete frame. Datagram transports emit it as a
/// single datagram; stream transports write every byte or fail.
pub trait Transport {
    /// Receive up to `buf.len()` bytes into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Transmit the whole of `data`, returning the number of bytes sent.
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether each `recv` delivers whole frames and nothing else.
    ///
    /// Datagram transports return `true`: bytes left over after the last
    /// complete frame of a read can never be finished by the next read.
    fn preserves_boundaries(&self) -> bool {
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv(buf)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn preserves_boundaries(&self) -> bool {
        (**self).preserves_boundaries()
    }
}

/// Transport over any `Read + Write` byte stream.
///
/// Used for serial links, Unix socket pairs and TCP. Frames may arrive split
/// across several reads or coalesced into one; reassembly is the channel's job.
pub struct StreamTransport<S> {
    inner: S,
    name: &'static str,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a stream.
    pub fn new(inner: S) -> Self {
        Self::with_name(inner, "stream")
    }

    /// Wrap a stream and give it a diagnostic name.
    pub fn with_name(inner: S, name: &'static str) -> Self {
        Self { inner, name }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.inner.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(offset),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("name", &self.name)
            .finish()
    }
}
