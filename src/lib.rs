//! Reading, modifying and writing Anvil world storage: the NBT tree
//! format and the region file container that packs up to 1024 compressed
//! chunk columns into one random-access file.
//!
//! The [`nbt`] module is self-contained and also handles standalone,
//! optionally gzip-framed NBT documents. On top of it sit the chunk model
//! ([`palette`], [`section`], [`column`]) and the sector-allocating
//! [`region`] layer.
//!
//! ```no_run
//! use anvil_world::palette::BlockState;
//! use anvil_world::position::RegionPosition;
//! use anvil_world::provider::{FolderRegionProvider, RegionProvider};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = FolderRegionProvider::new("world/region");
//! let region = provider.get_region(RegionPosition::new(0, 0))?;
//!
//! region.set_block_state(1, 64, 3, BlockState::new("minecraft:stone"))?;
//! region.flush_cached_chunks()?;
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod column;
pub mod error;
pub mod nbt;
pub mod palette;
pub mod position;
pub mod provider;
pub mod region;
pub mod section;

pub use crate::column::ChunkColumn;
pub use crate::error::{
    BlockAccessError, ChunkReadError, ChunkWriteError, ColumnError, PaletteError,
};
pub use crate::nbt::{CompoundTag, Tag};
pub use crate::palette::{BlockState, Palette};
pub use crate::position::{RegionChunkPosition, RegionPosition};
pub use crate::provider::{FolderRegionProvider, RegionProvider};
pub use crate::region::RegionFile;
pub use crate::section::ChunkSection;
