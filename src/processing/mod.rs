//! The transcoding pipeline: codec seam, compressor and transcoder.
//!
//! Both transformations are pure, stateless and single-item; batching and
//! state live in `commands` and `ledger` respectively.

pub mod codec;
mod compressor;
mod transcoder;

pub use codec::{Codec, NativeCodec};
pub use compressor::{BoundedImage, Compressor};
pub use transcoder::{TranscodedImage, Transcoder};
