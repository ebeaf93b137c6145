//! `ocinit` converts an OCI image layout on disk into a single CPIO archive
//! in the newc format — the merged filesystem view of the image, suitable
//! for use as a Linux kernel initramfs.
//!
//! # Overview
//!
//! The conversion is a pull-driven, single-threaded streaming pipeline:
//!
//! - **Layout parsing**: `index.json` and the image manifest it references
//!   are resolved to an ordered list of layer descriptors.
//! - **Layer decoding**: each layer blob is opened by its content-addressed
//!   path and streamed as a tar archive, gzip-decompressed when its media
//!   type says so.
//! - **Merging**: layers are walked topmost first, with AUFS-style whiteouts
//!   (`.wh.` entries and `.wh..wh..opq` opaque markers) resolving which
//!   version of each path is visible. Every path surfaces exactly once.
//! - **Writing**: each visible entry is translated into a newc header and
//!   written with its payload, 4-byte aligned, terminated by the
//!   `TRAILER!!!` record.
//!
//! Nothing is staged to disk and no layer is held in memory: state grows
//! with the number of distinct paths, not with payload size, and the output
//! is bit-identical across runs on the same layout.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::io;
//!
//! fn main() -> ocinit::OcinitResult<()> {
//!     let stdout = io::stdout();
//!     let summary = ocinit::convert::convert("./alpine-layout", stdout.lock())?;
//!     eprintln!("wrote {} entries", summary.get_entries());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`convert`] - The driver gluing the merged view to the writer
//! - [`cpio`] - newc header translation and archive writing
//! - [`oci`] - Layout parsing, layer decoding, and the merged view
//! - [`utils`] - Path cleaning and whiteout classification

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod cli;
pub mod convert;
pub mod cpio;
pub mod oci;
pub mod utils;

pub use error::*;
