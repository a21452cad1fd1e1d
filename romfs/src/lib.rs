//! Asset resolution over a romfs dump with an optional mod overlay.
#![forbid(unsafe_code)]

pub mod address_table;
pub mod codec;
pub mod document;
pub mod file_ref;
pub mod format;
pub mod gyml;
pub mod handler;
pub mod location;
pub mod romfs;
pub mod size_table;
pub mod stage_bcett;
pub mod system;

pub use address_table::{AddressTable, AddressTableError};
pub use codec::{
    Archive, ArchiveCodec, ArchiveError, Codecs, Compression, CompressionError, MemoryArchive,
    ZipArchiveCodec, ZstdCompression,
};
pub use document::read_document;
pub use file_ref::{
    FileRef, FileRefError, GymlKind, GymlRef, MuMapKind, MuMapRef, Ref, RefKind, RefOrEmpty,
    REF_PREFIX,
};
pub use format::{
    DocumentFormat, FileFormat, FormatError, PackFormat, RawFormat, SizeTableFormat,
    ADDRESS_TABLE_FORMAT, BCETT_FORMAT, GYML_FORMAT,
};
pub use gyml::{default_ref_for, AssetFile, GymlManager, GymlType};
pub use handler::{
    CollectingErrorHandler, DocumentErrorHandler, DocumentLoadingErrorHandler, ErrorReport,
    FileLoadingErrorHandler, FileResolutionErrorHandler, GymlLoadingErrorHandler, LoadFailed,
    LoggingErrorHandler, RomFsLoadErrorHandler, StageLoadingErrorHandler,
};
pub use location::RetrievedFileLocation;
pub use romfs::{LoadedFile, PackInfo, RomFs, SaveError, REQUIRED_SUB_DIRECTORIES};
pub use size_table::{parse_size_table, ResourceSizeTable, SizeTableError};
pub use stage_bcett::{load_stage_bcett, StageBcett, StageValidationReport};
pub use system::{MissingSystemFile, SystemFile};
