use std::io;
use std::num::ParseIntError;
use std::path::Path;
use std::str::FromStr;

/// Chunk coordinate of the block coordinate `n`.
///
/// Shifts are arithmetic, so negative world coordinates map correctly.
pub fn block_to_chunk(n: i32) -> i32 {
    n >> 4
}

/// Region coordinate of the chunk coordinate `n`.
pub fn chunk_to_region(n: i32) -> i32 {
    n >> 5
}

/// Region-local chunk coordinate (0..32) of the chunk coordinate `n`.
pub fn chunk_inside_region(n: i32) -> i32 {
    n & 31
}

/// Chunk-local block coordinate (0..16) of the block coordinate `n`.
pub fn block_inside_chunk(n: i32) -> i32 {
    n & 15
}

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
pub struct RegionPosition {
    pub x: i32,
    pub z: i32,
}

impl RegionPosition {
    pub fn new(x: i32, z: i32) -> RegionPosition {
        RegionPosition { x, z }
    }

    pub fn from_chunk_position(chunk_x: i32, chunk_z: i32) -> RegionPosition {
        let x = chunk_to_region(chunk_x);
        let z = chunk_to_region(chunk_z);

        RegionPosition::new(x, z)
    }

    pub fn from_filename(path: &Path) -> Result<RegionPosition, io::Error> {
        // we can use lossy because of the bound check later
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let parts: Vec<_> = filename.split('.').collect();

        let (x, z) = parse_coords(parts).map_err(|_| io::ErrorKind::InvalidInput)?;

        Ok(RegionPosition::new(x, z))
    }

    pub fn filename(self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Whether the chunk at absolute coordinates belongs to this region.
    pub fn contains_chunk(self, chunk_x: i32, chunk_z: i32) -> bool {
        self == RegionPosition::from_chunk_position(chunk_x, chunk_z)
    }
}

fn parse_coords(parts: Vec<&str>) -> Result<(i32, i32), ParseIntError> {
    let incorrect_format = parts.len() != 4 || parts[0] != "r" || parts[3] != "mca";

    if incorrect_format {
        // to throw the error (cant instantiate from outside)
        i32::from_str("")?;
    }

    Ok((i32::from_str(parts[1])?, i32::from_str(parts[2])?))
}

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
pub struct RegionChunkPosition {
    pub x: u8,
    pub z: u8,
}

impl RegionChunkPosition {
    pub fn new(x: u8, z: u8) -> RegionChunkPosition {
        debug_assert!(32 > x, "Region chunk x coordinate out of bounds");
        debug_assert!(32 > z, "Region chunk z coordinate out of bounds");

        RegionChunkPosition { x, z }
    }

    pub fn from_chunk_position(chunk_x: i32, chunk_z: i32) -> RegionChunkPosition {
        let x = chunk_inside_region(chunk_x) as u8;
        let z = chunk_inside_region(chunk_z) as u8;

        RegionChunkPosition::new(x, z)
    }

    /// Index of this chunk in the header tables.
    pub(crate) fn metadata_index(&self) -> usize {
        self.x as usize + self.z as usize * 32
    }
}
