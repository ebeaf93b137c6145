use std::{
    fmt::Write as _,
    io::Write,
};

use crate::{OcinitError, OcinitResult};

use super::CpioHeader;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Magic prefix of every newc header.
const MAGIC_NEWC: &str = "070701";

/// Byte length of the fixed header, the name excluded.
const FIXED_HEADER_LEN: usize = 110;

/// Pre-allocated padding bytes. Names and bodies align to 4.
const ZEROS: [u8; 4] = [0; 4];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A sequential writer for CPIO archives in the newc (`070701`) format.
///
/// Every entry is a 110-byte ASCII header (magic plus thirteen 8-digit
/// uppercase hex fields), the NUL-terminated name padded to a 4-byte
/// boundary, and the body padded likewise. `finish` emits the `TRAILER!!!`
/// record; the underlying sink is never closed by this type.
pub struct CpioNewcWriter<W: Write> {
    sink: W,
    open: Option<OpenEntry>,
    next_inode: u32,
    bytes_written: u64,
    closed: bool,
}

/// Accounting for the entry whose header has been written but whose body is
/// not yet complete.
#[derive(Debug)]
struct OpenEntry {
    name: String,
    declared: u64,
    written: u64,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<W: Write> CpioNewcWriter<W> {
    /// Creates a writer emitting to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            open: None,
            next_inode: 1,
            bytes_written: 0,
            closed: false,
        }
    }

    /// Total bytes emitted so far, padding included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes the header for the next entry.
    ///
    /// If a previous entry is still open its body padding is flushed first,
    /// which fails with `BodyUnderrun` when fewer than the declared bytes
    /// were supplied.
    pub fn write_header(&mut self, header: &CpioHeader) -> OcinitResult<()> {
        if self.closed {
            return Err(OcinitError::WriterClosed);
        }
        self.finish_open_entry()?;

        self.emit_header(header)?;
        self.open = Some(OpenEntry {
            name: header.get_name().clone(),
            declared: header.get_size(),
            written: 0,
        });
        self.next_inode = self.next_inode.max(header.get_inode().saturating_add(1));
        Ok(())
    }

    /// Appends body bytes to the entry whose header was last written. Short
    /// writes are fine and accumulate; exceeding the declared size is a
    /// `WriteTooLong` error.
    pub fn write_data(&mut self, data: &[u8]) -> OcinitResult<()> {
        if self.closed {
            return Err(OcinitError::WriterClosed);
        }
        let open = match self.open.as_mut() {
            Some(open) => open,
            None => {
                return Err(OcinitError::custom(anyhow::anyhow!(
                    "body bytes written before any header"
                )))
            }
        };

        if open.written + data.len() as u64 > open.declared {
            return Err(OcinitError::WriteTooLong {
                name: open.name.clone(),
                declared: open.declared,
            });
        }

        self.sink.write_all(data)?;
        open.written += data.len() as u64;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Completes the archive: closes the open entry, then emits the
    /// `TRAILER!!!` record with the next free inode. Idempotent. The sink
    /// itself stays open and unflushed.
    pub fn finish(&mut self) -> OcinitResult<()> {
        if self.closed {
            return Ok(());
        }
        self.finish_open_entry()?;

        let trailer = CpioHeader::trailer(self.next_inode);
        self.emit_header(&trailer)?;
        self.closed = true;
        Ok(())
    }

    /// Flushes the padding of the open entry, if any, after checking that
    /// its body arrived in full.
    fn finish_open_entry(&mut self) -> OcinitResult<()> {
        let open = match self.open.take() {
            Some(open) => open,
            None => return Ok(()),
        };

        if open.written < open.declared {
            return Err(OcinitError::BodyUnderrun {
                name: open.name,
                declared: open.declared,
                written: open.written,
            });
        }

        self.pad_to_boundary(open.declared)
    }

    /// Emits the fixed header, the NUL-terminated name, and the alignment
    /// padding for one entry.
    fn emit_header(&mut self, header: &CpioHeader) -> OcinitResult<()> {
        let name = header.get_name();
        let name_size = name.len() + 1;

        let mut fixed = String::with_capacity(FIXED_HEADER_LEN);
        fixed.push_str(MAGIC_NEWC);
        for value in [
            header.get_inode(),
            header.get_mode(),
            header.get_uid(),
            header.get_gid(),
            header.get_nlink(),
            header.get_mtime() as u32,
            header.get_size() as u32,
            header.get_devmajor(),
            header.get_devminor(),
            header.get_rdevmajor(),
            header.get_rdevminor(),
            name_size as u32,
            0, // checksum, always zero for newc
        ] {
            let _ = write!(fixed, "{:08X}", value);
        }

        self.sink.write_all(fixed.as_bytes())?;
        self.sink.write_all(name.as_bytes())?;
        self.sink.write_all(&[0])?;
        self.bytes_written += (FIXED_HEADER_LEN + name_size) as u64;

        self.pad_to_boundary((FIXED_HEADER_LEN + name_size) as u64)
    }

    /// Pads a region of `length` bytes out to the next 4-byte boundary.
    fn pad_to_boundary(&mut self, length: u64) -> OcinitResult<()> {
        let pad = ((4 - (length % 4)) % 4) as usize;
        if pad > 0 {
            self.sink.write_all(&ZEROS[..pad])?;
            self.bytes_written += pad as u64;
        }
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
