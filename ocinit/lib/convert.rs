//! The driver gluing the merged OCI view to the CPIO writer.

use std::{
    io::{Read, Write},
    path::Path,
};

use getset::CopyGetters;
use tar::EntryType;

use crate::{
    cpio::{CpioHeader, CpioNewcWriter},
    oci::OciImage,
    OcinitError, OcinitResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Size of the reusable buffer bodies are streamed through.
const COPY_BUFFER_SIZE: usize = 32 * 1024;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What a finished conversion amounted to.
#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct ConvertSummary {
    /// Number of file entries emitted, the trailer excluded.
    entries: u64,

    /// Total archive bytes written to the sink.
    bytes: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Streams the merged view of the image at `layout_dir` into `out` as a newc
/// CPIO archive.
///
/// Entries are assigned inodes monotonically from 1 in emission order, so
/// the output is bit-identical across runs on the same layout. The first
/// error halts the conversion; the sink is left mid-archive and must be
/// discarded.
pub fn convert(layout_dir: impl AsRef<Path>, out: impl Write) -> OcinitResult<ConvertSummary> {
    let layout_dir = layout_dir.as_ref();
    tracing::info!(layout = %layout_dir.display(), "converting image layout");

    let image = OciImage::open(layout_dir)?;
    let mut writer = CpioNewcWriter::new(out);
    let mut inode: u32 = 1;
    let mut entries: u64 = 0;
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    image.walk(|entry| {
        let header = CpioHeader::from_entry(entry, inode)?;
        tracing::trace!(name = %header.get_name(), inode, "writing entry");
        writer.write_header(&header)?;

        if entry.header().entry_type() == EntryType::Symlink {
            if let Some(target) = entry.link_target() {
                writer.write_data(&target)?;
            }
        } else {
            let mut remaining = header.get_size();
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let got = entry.read(&mut buf[..want])?;
                if got == 0 {
                    return Err(OcinitError::MalformedArchive(format!(
                        "layer body ended early for {}",
                        header.get_name()
                    )));
                }
                writer.write_data(&buf[..got])?;
                remaining -= got as u64;
            }
        }

        inode += 1;
        entries += 1;
        Ok(())
    })?;

    writer.finish()?;

    let summary = ConvertSummary {
        entries,
        bytes: writer.bytes_written(),
    };
    tracing::debug!(
        entries = summary.entries,
        bytes = summary.bytes,
        "archive complete"
    );

    Ok(summary)
}
