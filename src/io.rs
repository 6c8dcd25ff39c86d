//! Low-level buffered byte sink and source.
//!
//! Both ends track the current stream offset so that format errors can report
//! where decoding stopped and the API layer can log how much was written.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use crate::error::{FormatError, RefcodeError, Result};

/// A buffered writer that tracks how many bytes have been written.
#[derive(Debug)]
pub struct ByteSink<W: Write> {
    writer: BufWriter<W>,
    offset: u64,
}

impl<W: Write> ByteSink<W> {
    /// Wraps a writer with a buffer of `capacity` bytes.
    pub fn new(writer: W, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, writer),
            offset: 0,
        }
    }

    /// Writes a single byte.
    pub fn put(&mut self, byte: u8) -> Result<()> {
        self.write_all(&[byte])
    }

    /// Writes a complete buffer.
    pub fn write_all(&mut self, buffer: &[u8]) -> Result<()> {
        self.writer.write_all(buffer)?;
        self.offset += buffer.len() as u64;
        Ok(())
    }

    /// Flushes buffered bytes to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| RefcodeError::from(e.into_error()))
    }
}

/// A buffered reader that tracks the offset of the next unread byte.
#[derive(Debug)]
pub struct ByteSource<R: Read> {
    reader: BufReader<R>,
    offset: u64,
}

impl<R: Read> ByteSource<R> {
    /// Wraps a reader with a buffer of `capacity` bytes.
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            offset: 0,
        }
    }

    /// Offset of the next byte to be read.
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Whether the input is exhausted.
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }

    /// The next byte without consuming it, `None` at the end of input.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    /// Reads one byte.
    pub fn byte(&mut self) -> Result<u8> {
        let [b] = self.array::<1>()?;
        Ok(b)
    }

    /// Reads exactly `N` bytes.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.reader.read_exact(&mut buf).map_err(|e| self.eof(e))?;
        self.offset += N as u64;
        Ok(buf)
    }

    /// Reads exactly `len` bytes.
    ///
    /// The buffer grows as bytes actually arrive, so a corrupt length field
    /// cannot force a huge up-front allocation.
    pub fn bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let read = (&mut self.reader).take(len).read_to_end(&mut out)?;
        self.offset += read as u64;
        if (read as u64) < len {
            return Err(FormatError::UnexpectedEof {
                offset: self.offset,
            }
            .into());
        }
        Ok(out)
    }

    /// Reads up to and excluding the next NUL byte, consuming the NUL.
    pub fn until_nul(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let read = self.reader.read_until(0, &mut out)?;
        self.offset += read as u64;
        if out.pop() != Some(0) {
            return Err(FormatError::UnexpectedEof {
                offset: self.offset,
            }
            .into());
        }
        Ok(out)
    }

    fn eof(&self, err: io::Error) -> RefcodeError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::UnexpectedEof {
                offset: self.offset,
            }
            .into()
        } else {
            err.into()
        }
    }
}
