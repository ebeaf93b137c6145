//! OCI layout parsing, layer decoding, and the merged filesystem view of an
//! image.

mod layer;
mod layout;
mod merge;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use layer::*;
pub use layout::*;
pub use merge::*;
