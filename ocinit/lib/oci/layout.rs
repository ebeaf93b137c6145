use std::{
    fs,
    path::{Path, PathBuf},
};

use getset::Getters;
use oci_spec::image::{Descriptor, ImageIndex, ImageManifest, MediaType};

use crate::{
    utils::{OCI_BLOBS_SUBDIR, OCI_INDEX_FILENAME},
    OcinitError, OcinitResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An OCI image layout directory (`index.json` plus content-addressed
/// `blobs/`) resolved down to the single image manifest it stores.
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct OciLayout {
    /// The layout directory.
    dir: PathBuf,

    /// The image manifest the index points at.
    manifest: ImageManifest,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OciLayout {
    /// Opens a layout directory: parses `index.json`, resolves its single
    /// manifest descriptor, and loads the manifest blob.
    ///
    /// The index must contain exactly one manifest descriptor. Multi-arch
    /// indexes carry several, and picking one silently would convert an
    /// arbitrary platform, so anything other than one is rejected.
    pub fn open(dir: impl Into<PathBuf>) -> OcinitResult<Self> {
        let dir = dir.into();

        let index_path = dir.join(OCI_INDEX_FILENAME);
        let index_contents = fs::read_to_string(&index_path).map_err(|e| {
            OcinitError::MalformedLayout(format!("reading {}: {}", index_path.display(), e))
        })?;
        let index: ImageIndex = serde_json::from_str(&index_contents)
            .map_err(|e| OcinitError::MalformedLayout(format!("parsing image index: {}", e)))?;

        let descriptor = select_manifest(&index)?;
        if *descriptor.media_type() != MediaType::ImageManifest {
            return Err(OcinitError::UnexpectedMediaType(
                descriptor.media_type().to_string(),
            ));
        }

        let manifest_path = blob_path_in(&dir, descriptor);
        let manifest_contents = fs::read_to_string(&manifest_path).map_err(|e| {
            OcinitError::MalformedLayout(format!(
                "reading manifest blob {}: {}",
                manifest_path.display(),
                e
            ))
        })?;
        let manifest: ImageManifest = serde_json::from_str(&manifest_contents)
            .map_err(|e| OcinitError::MalformedLayout(format!("parsing image manifest: {}", e)))?;

        tracing::debug!(
            dir = %dir.display(),
            layers = manifest.layers().len(),
            "loaded image manifest"
        );

        Ok(Self { dir, manifest })
    }

    /// The image's layer descriptors in application order, base first.
    pub fn layers(&self) -> &[Descriptor] {
        self.manifest.layers()
    }

    /// The on-disk location of a descriptor's blob.
    pub fn blob_path(&self, descriptor: &Descriptor) -> PathBuf {
        blob_path_in(&self.dir, descriptor)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn select_manifest(index: &ImageIndex) -> OcinitResult<&Descriptor> {
    match index.manifests().as_slice() {
        [] => Err(OcinitError::MalformedLayout(
            "index contains no manifests".to_string(),
        )),
        [descriptor] => Ok(descriptor),
        manifests => Err(OcinitError::MalformedLayout(format!(
            "index contains {} manifests and no platform was selected",
            manifests.len()
        ))),
    }
}

fn blob_path_in(dir: &Path, descriptor: &Descriptor) -> PathBuf {
    let digest = descriptor.digest();
    dir.join(OCI_BLOBS_SUBDIR)
        .join(digest.algorithm().to_string())
        .join(digest.digest())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
