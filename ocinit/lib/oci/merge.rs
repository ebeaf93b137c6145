use std::{
    collections::{BTreeMap, HashSet},
    io::{self, Read},
    path::PathBuf,
};

use getset::Getters;
use tar::{EntryType, Header};

use crate::{
    utils::{archive_name, classify_whiteout, clean_entry_path, path_within, Whiteout},
    OcinitError, OcinitResult,
};

use super::{LayerEntry, LayerReader, OciLayout};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Prefix of PAX records carrying extended attributes.
const PAX_XATTR_PREFIX: &str = "SCHILY.xattr.";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The merged filesystem view of an OCI image.
///
/// Layers are walked topmost first so that the highest layer's version of a
/// path wins; whiteout entries hide lower-layer paths as the walk descends.
/// Each visible path is surfaced exactly once.
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct OciImage {
    /// The parsed layout backing this image.
    layout: OciLayout,
}

/// A single visible entry of the merged view.
///
/// Reading from it yields exactly the body bytes the tar header declares;
/// anything left unread is skipped when the walk advances.
pub struct MergedEntry<'e, 'a> {
    name: String,
    entry: &'e mut LayerEntry<'a>,
}

/// Whiteout book-keeping carried across layers during a walk.
///
/// `seen` holds every path already emitted or hidden by a `.wh.` entry in a
/// higher layer. `opaque` holds directories below which lower layers
/// contribute nothing; markers are queued and applied at the end of their
/// own layer, since an opaque directory's own layer still populates it.
#[derive(Debug, Default)]
struct MergeState {
    seen: HashSet<String>,
    opaque: HashSet<String>,
    pending_opaque: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OciImage {
    /// Opens an OCI layout directory and prepares the merged view of its
    /// image.
    pub fn open(dir: impl Into<PathBuf>) -> OcinitResult<Self> {
        Ok(Self {
            layout: OciLayout::open(dir)?,
        })
    }

    /// Walks the merged view, calling `visit` once per visible entry in
    /// emission order: topmost layer first, natural tar order within a
    /// layer. Layers are opened lazily, one at a time.
    ///
    /// The current entry's body must be consumed inside the callback if its
    /// payload is wanted; the walk discards whatever remains before moving
    /// on.
    pub fn walk<F>(&self, mut visit: F) -> OcinitResult<()>
    where
        F: FnMut(&mut MergedEntry<'_, '_>) -> OcinitResult<()>,
    {
        let mut state = MergeState::default();

        for descriptor in self.layout.layers().iter().rev() {
            tracing::debug!(digest = %descriptor.digest(), "applying layer");

            let mut layer = LayerReader::open(&self.layout, descriptor)?;
            let mut entries = layer.entries()?;

            while let Some(next) = entries.next() {
                let mut entry =
                    next.map_err(|e| OcinitError::MalformedArchive(e.to_string()))?;

                let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
                let cleaned = clean_entry_path(&raw)?;
                if cleaned.is_empty() {
                    // The archive root is implicit in the output.
                    continue;
                }

                if !state.admit(&cleaned) {
                    tracing::trace!(path = %cleaned, "suppressed entry");
                    continue;
                }

                let is_dir = entry.header().entry_type() == EntryType::Directory;
                let name = archive_name(&cleaned, is_dir);
                visit(&mut MergedEntry::new(name, &mut entry))?;
            }

            state.finish_layer();
        }

        Ok(())
    }
}

impl<'e, 'a> MergedEntry<'e, 'a> {
    pub(crate) fn new(name: String, entry: &'e mut LayerEntry<'a>) -> Self {
        Self { name, entry }
    }

    /// The emitted archive name: `./` prefix, trailing `/` for directories.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying tar header.
    pub fn header(&self) -> &Header {
        self.entry.header()
    }

    /// The entry's logical body size in bytes.
    pub fn size(&self) -> OcinitResult<u64> {
        self.entry
            .header()
            .size()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))
    }

    /// The symlink or hardlink target, if the entry carries one.
    pub fn link_target(&self) -> Option<Vec<u8>> {
        self.entry.link_name_bytes().map(|bytes| bytes.into_owned())
    }

    /// Extended attributes conveyed through `SCHILY.xattr.` PAX records,
    /// keyed by the attribute name with the prefix stripped.
    pub fn xattrs(&mut self) -> OcinitResult<BTreeMap<String, Vec<u8>>> {
        let mut xattrs = BTreeMap::new();

        let Some(extensions) = self
            .entry
            .pax_extensions()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))?
        else {
            return Ok(xattrs);
        };

        for extension in extensions {
            let extension =
                extension.map_err(|e| OcinitError::MalformedArchive(e.to_string()))?;
            let Ok(key) = extension.key() else {
                continue;
            };
            if let Some(attr) = key.strip_prefix(PAX_XATTR_PREFIX) {
                xattrs.insert(attr.to_string(), extension.value_bytes().to_vec());
            }
        }

        Ok(xattrs)
    }
}

impl MergeState {
    /// Decides whether the entry at `cleaned` is visible. Whiteout entries
    /// update the book-keeping and are never visible themselves.
    fn admit(&mut self, cleaned: &str) -> bool {
        match classify_whiteout(cleaned) {
            Some(Whiteout::Opaque(dir)) => {
                self.pending_opaque.push(dir);
                return false;
            }
            Some(Whiteout::File(target)) => {
                self.seen.insert(target);
                return false;
            }
            None => {}
        }

        if self.opaque.iter().any(|dir| path_within(cleaned, dir)) {
            return false;
        }
        if self.seen.contains(cleaned) {
            return false;
        }

        self.seen.insert(cleaned.to_string());
        true
    }

    /// Activates the opaque markers collected while walking the layer that
    /// just finished.
    fn finish_layer(&mut self) {
        self.opaque.extend(self.pending_opaque.drain(..));
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Read for MergedEntry<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.entry.read(buf)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
