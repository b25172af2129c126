// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-delimited framing.
//!
//! # Frame Format
//!
//! ```text
//! +------------------+----------------------+
//! | length (ULEB128) | payload (length)     |
//! +------------------+----------------------+
//! ```
//!
//! A stream is a plain sequence of frames. Readers resynchronize by reading
//! the length prefix, then exactly that many payload bytes, until a clean
//! end-of-stream.

use std::io::{self, Read, Write};

/// Maximum bytes needed to encode a u64 in ULEB128.
pub const MAX_VARINT_LEN: usize = 10;

/// Largest payload a reader accepts (64 MiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

const CONTINUATION_BIT: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

/// Encode a u64 as ULEB128 into the buffer, returning the byte count.
///
/// # Panics
///
/// Panics if the buffer is smaller than [`varint_len`] of the value.
#[inline]
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | CONTINUATION_BIT;
        i += 1;
    }
}

/// Number of bytes needed to encode a value.
#[inline]
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Read one ULEB128 value.
///
/// Returns `Ok(None)` when the stream ends before the first byte.
pub fn read_varint<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut byte = [0u8; 1];

    for i in 0..MAX_VARINT_LEN {
        if let Err(e) = r.read_exact(&mut byte) {
            if i == 0 && e.kind() == io::ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e);
        }

        let data = u64::from(byte[0] & DATA_MASK);
        // 10th byte may only carry the top bit of a u64
        if i == MAX_VARINT_LEN - 1 && data > 1 {
            break;
        }
        value |= data << shift;
        if byte[0] & CONTINUATION_BIT == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "varint overflow (too many bytes for u64)",
    ))
}

/// Writes length-prefixed frames onto an underlying sink.
///
/// Prefix and payload go out in a single `write_all`, so a channel sink
/// receives exactly one message per frame.
///
/// The frame buffer starts with a [`MAX_VARINT_LEN`] slot. Payloads are
/// serialized right after it and the prefix is filled in backwards, so the
/// payload is never copied twice.
pub struct DelimitedWriter<W: Write> {
    inner: W,
    frame: Vec<u8>,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frame: Vec::new(),
        }
    }

    /// Write one frame, returning the number of bytes put on the sink.
    pub fn put_record(&mut self, payload: &[u8]) -> io::Result<usize> {
        self.begin_frame().extend_from_slice(payload);
        self.finish_frame()
    }

    /// Start a frame and return the buffer its payload is appended to.
    ///
    /// Nothing reaches the sink until [`finish_frame`](Self::finish_frame).
    pub fn begin_frame(&mut self) -> &mut Vec<u8> {
        self.frame.clear();
        self.frame.resize(MAX_VARINT_LEN, 0);
        &mut self.frame
    }

    /// Prefix the pending payload with its length and write the frame.
    pub fn finish_frame(&mut self) -> io::Result<usize> {
        let payload_len = self.frame.len().saturating_sub(MAX_VARINT_LEN);
        let mut prefix = [0u8; MAX_VARINT_LEN];
        let n = encode_varint(payload_len as u64, &mut prefix);

        let start = MAX_VARINT_LEN - n;
        self.frame[start..MAX_VARINT_LEN].copy_from_slice(&prefix[..n]);
        self.inner.write_all(&self.frame[start..])?;

        Ok(n + payload_len)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the underlying sink. Nothing is buffered at this level.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads length-prefixed frames back.
pub struct DelimitedReader<R: Read> {
    inner: R,
    max_frame_size: usize,
}

impl<R: Read> DelimitedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Override the frame size guard.
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Read the next frame payload.
    ///
    /// `Ok(None)` marks a clean end-of-stream; a stream that ends inside a
    /// frame yields `UnexpectedEof`.
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let len = match read_varint(&mut self.inner)? {
            Some(len) => len,
            None => return Ok(None),
        };

        let len = usize::try_from(len)
            .ok()
            .filter(|&l| l <= self.max_frame_size)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {} bytes exceeds limit", len),
                )
            })?;

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload)?;
        Ok(Some(payload))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for DelimitedReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
