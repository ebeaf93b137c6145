use std::{
    fs::File,
    io::{BufReader, Read},
};

use flate2::read::GzDecoder;
use oci_spec::image::{Descriptor, MediaType};
use tar::{Archive, Entries};

use crate::{OcinitError, OcinitResult};

use super::OciLayout;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A tar entry borrowed from a layer's archive stream.
pub type LayerEntry<'a> = tar::Entry<'a, Box<dyn Read>>;

/// A streaming decoder over a single layer blob.
///
/// The blob is opened by its content-addressed path and, for the gzip media
/// type, wrapped in a streaming decompressor. Dropping the reader releases
/// the decompressor and the underlying file.
pub struct LayerReader {
    archive: Archive<Box<dyn Read>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LayerReader {
    /// Opens the blob behind `descriptor` as a tar stream.
    ///
    /// Accepts `application/vnd.oci.image.layer.v1.tar` and its `+gzip`
    /// variant; any other media type is a hard failure.
    pub fn open(layout: &OciLayout, descriptor: &Descriptor) -> OcinitResult<Self> {
        let blob_path = layout.blob_path(descriptor);

        let reader: Box<dyn Read> = match descriptor.media_type() {
            MediaType::ImageLayer => {
                let file = File::open(&blob_path).map_err(|e| {
                    OcinitError::MalformedLayout(format!(
                        "opening layer blob {}: {}",
                        blob_path.display(),
                        e
                    ))
                })?;
                Box::new(BufReader::new(file))
            }
            MediaType::ImageLayerGzip => {
                let file = File::open(&blob_path).map_err(|e| {
                    OcinitError::MalformedLayout(format!(
                        "opening layer blob {}: {}",
                        blob_path.display(),
                        e
                    ))
                })?;
                Box::new(GzDecoder::new(BufReader::new(file)))
            }
            other => {
                return Err(OcinitError::UnsupportedLayerType(other.to_string()));
            }
        };

        Ok(Self {
            archive: Archive::new(reader),
        })
    }

    /// The sequential tar entries of this layer. Each entry's body reader is
    /// bounded to the size its header declares.
    pub fn entries(&mut self) -> OcinitResult<Entries<'_, Box<dyn Read>>> {
        self.archive
            .entries()
            .map_err(|e| OcinitError::MalformedArchive(e.to_string()))
    }
}
