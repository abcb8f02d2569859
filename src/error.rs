use crate::nbt::decode::TagDecodeError;
use crate::nbt::CompoundTagError;
use crate::palette::BlockState;
use std::error::Error;
use std::fmt;
use std::io;

/// Possible errors of palette bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteError {
    /// Operation referenced a state the palette does not contain.
    UnknownState { state: BlockState },
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::UnknownState { state } => {
                write!(f, "block state {} is not in the palette", state.name())
            }
        }
    }
}

impl Error for PaletteError {}

/// Possible errors while decoding or addressing a chunk column.
#[derive(Debug)]
pub enum ColumnError {
    /// Coordinate outside the column: y beyond 0..=255, or a local x/z
    /// beyond 0..=15.
    CoordinateOutOfRange {
        coordinate: &'static str,
        value: i32,
    },
    /// Required tag is absent from the column NBT.
    MissingTag { tag_name: String },
    /// Tag is present but its kind or value is unusable.
    InvalidTag { tag_name: String },
    /// Palette bookkeeping failed while reconstructing a section.
    Palette { palette_error: PaletteError },
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnError::CoordinateOutOfRange { coordinate, value } => {
                write!(f, "coordinate {} = {} out of range", coordinate, value)
            }
            ColumnError::MissingTag { tag_name } => {
                write!(f, "column tag \"{}\" is missing", tag_name)
            }
            ColumnError::InvalidTag { tag_name } => {
                write!(f, "column tag \"{}\" is invalid", tag_name)
            }
            ColumnError::Palette { palette_error } => write!(f, "{}", palette_error),
        }
    }
}

impl Error for ColumnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ColumnError::Palette { palette_error } => Some(palette_error),
            _ => None,
        }
    }
}

impl From<PaletteError> for ColumnError {
    fn from(palette_error: PaletteError) -> Self {
        ColumnError::Palette { palette_error }
    }
}

impl From<CompoundTagError> for ColumnError {
    fn from(error: CompoundTagError) -> Self {
        match error {
            CompoundTagError::TagNotFound { tag_name } => ColumnError::MissingTag { tag_name },
            CompoundTagError::TagWrongType { tag_name, .. } => {
                ColumnError::InvalidTag { tag_name }
            }
        }
    }
}

/// Possible errors while loading a chunk.
#[derive(Debug)]
pub enum ChunkReadError {
    /// Chunk coordinates belong to a different region file.
    ChunkOutOfRegion { chunk_x: i32, chunk_z: i32 },
    /// Declared payload length cannot hold even the compression byte.
    ///
    /// Region file is corrupted.
    MalformedLength { length: u32 },
    /// Chunk length overlaps declared maximum.
    ///
    /// Region file is corrupted.
    LengthExceedsMaximum {
        /// Chunk length.
        length: u32,
        /// Chunk maximum expected length.
        maximum_length: u32,
    },
    /// Currently there are only 2 types of compression: Gzip and Zlib.
    ///
    /// Region file is corrupted or a new compression type was introduced.
    UnsupportedCompressionScheme {
        /// Compression scheme type id.
        compression_scheme: u8,
    },
    /// I/O error which happened while chunk data was read from the region.
    IOError { io_error: io::Error },
    /// Error while decoding binary data to an NBT tag.
    ///
    /// Region file is corrupted.
    TagDecodeError { tag_decode_error: TagDecodeError },
    /// Payload decoded to NBT but does not describe a chunk column.
    MalformedColumn { column_error: ColumnError },
}

impl fmt::Display for ChunkReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkReadError::ChunkOutOfRegion { chunk_x, chunk_z } => {
                write!(f, "chunk ({}, {}) is outside this region", chunk_x, chunk_z)
            }
            ChunkReadError::MalformedLength { length } => {
                write!(f, "malformed chunk payload length {}", length)
            }
            ChunkReadError::LengthExceedsMaximum {
                length,
                maximum_length,
            } => write!(
                f,
                "chunk payload length {} exceeds maximum {}",
                length, maximum_length
            ),
            ChunkReadError::UnsupportedCompressionScheme { compression_scheme } => {
                write!(f, "unsupported compression scheme {}", compression_scheme)
            }
            ChunkReadError::IOError { io_error } => write!(f, "{}", io_error),
            ChunkReadError::TagDecodeError { tag_decode_error } => {
                write!(f, "{}", tag_decode_error)
            }
            ChunkReadError::MalformedColumn { column_error } => write!(f, "{}", column_error),
        }
    }
}

impl Error for ChunkReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChunkReadError::IOError { io_error } => Some(io_error),
            ChunkReadError::TagDecodeError { tag_decode_error } => Some(tag_decode_error),
            ChunkReadError::MalformedColumn { column_error } => Some(column_error),
            _ => None,
        }
    }
}

impl From<io::Error> for ChunkReadError {
    fn from(io_error: io::Error) -> Self {
        ChunkReadError::IOError { io_error }
    }
}

impl From<TagDecodeError> for ChunkReadError {
    fn from(tag_decode_error: TagDecodeError) -> Self {
        ChunkReadError::TagDecodeError { tag_decode_error }
    }
}

impl From<ColumnError> for ChunkReadError {
    fn from(column_error: ColumnError) -> Self {
        ChunkReadError::MalformedColumn { column_error }
    }
}

/// Possible errors while saving a chunk.
#[derive(Debug)]
pub enum ChunkWriteError {
    /// Serialized chunk occupies 256 sectors (1 MiB) or more; the location
    /// table cannot express it.
    LengthExceedsMaximum {
        /// Chunk length.
        length: u32,
    },
    /// Chunk coordinates belong to a different region file.
    ChunkOutOfRegion { chunk_x: i32, chunk_z: i32 },
    /// Column could not be serialized to NBT.
    MalformedColumn { column_error: ColumnError },
    /// I/O error which happened while chunk data was written to the region.
    IOError { io_error: io::Error },
}

impl fmt::Display for ChunkWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkWriteError::LengthExceedsMaximum { length } => {
                write!(f, "chunk payload length {} exceeds 1 MiB", length)
            }
            ChunkWriteError::ChunkOutOfRegion { chunk_x, chunk_z } => {
                write!(f, "chunk ({}, {}) is outside this region", chunk_x, chunk_z)
            }
            ChunkWriteError::MalformedColumn { column_error } => write!(f, "{}", column_error),
            ChunkWriteError::IOError { io_error } => write!(f, "{}", io_error),
        }
    }
}

impl Error for ChunkWriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChunkWriteError::MalformedColumn { column_error } => Some(column_error),
            ChunkWriteError::IOError { io_error } => Some(io_error),
            _ => None,
        }
    }
}

impl From<io::Error> for ChunkWriteError {
    fn from(io_error: io::Error) -> Self {
        ChunkWriteError::IOError { io_error }
    }
}

impl From<ColumnError> for ChunkWriteError {
    fn from(column_error: ColumnError) -> Self {
        ChunkWriteError::MalformedColumn { column_error }
    }
}

/// Possible errors of block and biome access routed through a region file.
#[derive(Debug)]
pub enum BlockAccessError {
    /// Read targeted a chunk that is neither cached nor on disk.
    ChunkNotPresent { chunk_x: i32, chunk_z: i32 },
    /// Block coordinates resolve to a chunk outside this region.
    ChunkOutOfRegion { chunk_x: i32, chunk_z: i32 },
    /// Coordinate validation or section bookkeeping failed.
    Column { column_error: ColumnError },
    /// Backing chunk could not be loaded.
    Read { read_error: ChunkReadError },
}

impl fmt::Display for BlockAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockAccessError::ChunkNotPresent { chunk_x, chunk_z } => {
                write!(f, "chunk ({}, {}) is not present", chunk_x, chunk_z)
            }
            BlockAccessError::ChunkOutOfRegion { chunk_x, chunk_z } => {
                write!(f, "chunk ({}, {}) is outside this region", chunk_x, chunk_z)
            }
            BlockAccessError::Column { column_error } => write!(f, "{}", column_error),
            BlockAccessError::Read { read_error } => write!(f, "{}", read_error),
        }
    }
}

impl Error for BlockAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BlockAccessError::Column { column_error } => Some(column_error),
            BlockAccessError::Read { read_error } => Some(read_error),
            _ => None,
        }
    }
}

impl From<ColumnError> for BlockAccessError {
    fn from(column_error: ColumnError) -> Self {
        BlockAccessError::Column { column_error }
    }
}

impl From<ChunkReadError> for BlockAccessError {
    fn from(read_error: ChunkReadError) -> Self {
        match read_error {
            ChunkReadError::ChunkOutOfRegion { chunk_x, chunk_z } => {
                BlockAccessError::ChunkOutOfRegion { chunk_x, chunk_z }
            }
            read_error => BlockAccessError::Read { read_error },
        }
    }
}
