use byml_value::{DocumentError, Value};
use thiserror::Error;

use crate::codec::{Archive, ArchiveError, Codecs};
use crate::size_table::{parse_size_table, ResourceSizeTable, SizeTableError};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    SizeTable(#[from] SizeTableError),
}

/// How to turn a located file's bytes into a value.
///
/// `compressed` formats are decompressed before `read` when they come from
/// the file system; pack entries are always stored decompressed.
pub trait FileFormat {
    type Output;

    fn compressed(&self) -> bool;
    fn read(&self, codecs: &Codecs, bytes: Vec<u8>) -> Result<Self::Output, FormatError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentFormat {
    pub compressed: bool,
}

pub const GYML_FORMAT: DocumentFormat = DocumentFormat { compressed: false };
pub const BCETT_FORMAT: DocumentFormat = DocumentFormat { compressed: true };
pub const ADDRESS_TABLE_FORMAT: DocumentFormat = DocumentFormat { compressed: true };

impl FileFormat for DocumentFormat {
    type Output = Value;

    fn compressed(&self) -> bool {
        self.compressed
    }

    fn read(&self, codecs: &Codecs, bytes: Vec<u8>) -> Result<Value, FormatError> {
        Ok(codecs.document.parse(&bytes)?)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackFormat;

impl FileFormat for PackFormat {
    type Output = Box<dyn Archive>;

    fn compressed(&self) -> bool {
        true
    }

    fn read(&self, codecs: &Codecs, bytes: Vec<u8>) -> Result<Box<dyn Archive>, FormatError> {
        Ok(codecs.archive.open(&bytes)?)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeTableFormat;

impl FileFormat for SizeTableFormat {
    type Output = ResourceSizeTable;

    fn compressed(&self) -> bool {
        true
    }

    fn read(&self, _codecs: &Codecs, bytes: Vec<u8>) -> Result<ResourceSizeTable, FormatError> {
        Ok(parse_size_table(&bytes)?)
    }
}

/// Bytes as stored, after decompression when `compressed` is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFormat {
    pub compressed: bool,
}

impl FileFormat for RawFormat {
    type Output = Vec<u8>;

    fn compressed(&self) -> bool {
        self.compressed
    }

    fn read(&self, _codecs: &Codecs, bytes: Vec<u8>) -> Result<Vec<u8>, FormatError> {
        Ok(bytes)
    }
}
