// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod ledger;
pub mod processing;
pub mod commands;

// Public exports for external consumers
pub use commands::{ConverterApp, DEFAULT_TARGET_FORMAT};
pub use core::{
    ArtifactRecord, BatchOutcome, CompressionSettings, ConvertedArtifact, SettingsStore,
    SkippedImage, SourceImage,
};
pub use ledger::{
    ConversionLedger, JsonFileStore, LedgerStore, MemoryStore, PersistedState, PreviewHandle,
    PreviewRegistry, STORE_FILE_NAME,
};
pub use processing::{BoundedImage, Codec, Compressor, NativeCodec, TranscodedImage, Transcoder};
pub use utils::{rewrite_extension, ConverterError, ConverterResult, OutputFormat};

// This library file is the public API for consuming this crate as a library.
// The CLI entry point is in main.rs.
