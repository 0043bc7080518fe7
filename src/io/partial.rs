use std::io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};

/// A window over `[start, start + length)` of a seekable stream, with its own
/// zero-based position space. Reads and writes clamp at the window end; the
/// underlying position outside the window is not restored.
pub struct PartialStream<S> {
    inner: S,
    start: u64,
    length: u64,
}

impl<S: Seek> PartialStream<S> {
    /// Wraps `inner`, seeking it to the window start.
    pub fn new(mut inner: S, start: u64, length: u64) -> Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            length,
        })
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn remaining(&mut self) -> Result<u64> {
        let position = self.inner.stream_position()?;
        let consumed = position.saturating_sub(self.start);
        Ok(self.length.saturating_sub(consumed))
    }
}

impl<S: Read + Seek> Read for PartialStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = self.remaining()?;
        if remaining == 0 {
            return Ok(0);
        }
        let limit = remaining.min(buf.len() as u64) as usize;
        self.inner.read(&mut buf[..limit])
    }
}

impl<S: Write + Seek> Write for PartialStream<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let remaining = self.remaining()?;
        if remaining == 0 {
            return Ok(0);
        }
        let limit = remaining.min(buf.len() as u64) as usize;
        self.inner.write(&buf[..limit])
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

impl<S: Seek> Seek for PartialStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let absolute = match pos {
            SeekFrom::Start(offset) => {
                self.inner.seek(SeekFrom::Start(self.start + offset))?
            }
            SeekFrom::End(offset) => {
                let target = self.start as i64 + self.length as i64 + offset;
                if target < 0 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "seek before window start",
                    ));
                }
                self.inner.seek(SeekFrom::Start(target as u64))?
            }
            SeekFrom::Current(offset) => self.inner.seek(SeekFrom::Current(offset))?,
        };
        absolute.checked_sub(self.start).ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput, "seek before window start")
        })
    }
}
