use crate::column::ChunkColumn;
use crate::error::{BlockAccessError, ChunkReadError, ChunkWriteError};
use crate::nbt::decode::{read_gzip_compound_tag, read_zlib_compound_tag};
use crate::nbt::encode::write_zlib_compound_tag;
use crate::nbt::CompoundTag;
use crate::palette::BlockState;
use crate::position::{block_inside_chunk, block_to_chunk, RegionChunkPosition, RegionPosition};
use bitvec::prelude::*;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::collections::HashMap;
use std::io;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Amount of chunks in region.
const REGION_CHUNKS: usize = 1024;
/// Region header length in bytes: the location table and the timestamp
/// table, one sector each.
const REGION_HEADER_BYTES_LENGTH: u64 = 8192;
/// Region sector length in bytes.
const REGION_SECTOR_BYTES_LENGTH: u64 = 4096;
/// Maximum chunk length in bytes; the location encoding caps a chunk at
/// 255 sectors, so 256 is already unrepresentable.
const CHUNK_MAXIMUM_BYTES_LENGTH: u32 = REGION_SECTOR_BYTES_LENGTH as u32 * 256;

/// Gzip compression type value.
const GZIP_COMPRESSION_TYPE: u8 = 1;
/// Zlib compression type value.
const ZLIB_COMPRESSION_TYPE: u8 = 2;

/// A region file: up to 32x32 chunk columns packed into one seekable
/// source behind a sector allocator.
///
/// Columns load lazily into a shared cache; mutations through cached
/// columns reach the file only on [`RegionFile::write_column`] or
/// [`RegionFile::flush_cached_chunks`]. Dropping the region releases the
/// source without flushing.
pub struct RegionFile<S> {
    /// Coordinates of this region in the region grid.
    position: RegionPosition,
    /// File state: source, header tables and the free-sector map, all
    /// guarded by one lock so allocation and the file offset move
    /// together.
    io: Mutex<RegionIo<S>>,
    /// Cached columns by header index; at most one loader populates a
    /// slot and every caller shares the same column.
    columns: Mutex<HashMap<usize, Arc<Mutex<ChunkColumn>>>>,
}

struct RegionIo<S> {
    source: S,
    /// `(sector_offset << 8) | sector_count` per chunk; zero means absent.
    locations: [u32; REGION_CHUNKS],
    /// Seconds since epoch, low 32 bits.
    timestamps: [u32; REGION_CHUNKS],
    /// One bit per file sector; set means free.
    free_sectors: BitVec,
}

/// Marks free sectors: everything minus the header and each valid
/// location's run. Runs reaching past the end of the file are tolerated
/// and simply not marked.
fn free_sectors(total_sectors: usize, locations: &[u32; REGION_CHUNKS]) -> BitVec {
    let mut free_sectors = bitvec![1; total_sectors];

    free_sectors.set(0, false);
    free_sectors.set(1, false);

    for &location in locations.iter() {
        if location == 0 {
            continue;
        }

        let start_index = (location >> 8) as usize;
        let end_index = start_index + (location & 0xFF) as usize;

        if end_index > free_sectors.len() {
            continue;
        }

        for index in start_index..end_index {
            free_sectors.set(index, false);
        }
    }

    free_sectors
}

fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as u32)
        .unwrap_or(0)
}

impl<S: Read + Write + Seek> RegionFile<S> {
    /// Opens a region over `source`, initializing the header of a fresh
    /// or truncated file and padding the length to a sector multiple.
    pub fn load(position: RegionPosition, mut source: S) -> Result<RegionFile<S>, io::Error> {
        let mut source_len = source.len()?;

        if source_len < REGION_HEADER_BYTES_LENGTH {
            debug!(target: "anvil-world", "Initializing header of region {:?}", position);

            source.seek(SeekFrom::Start(0))?;
            source.write_all(&[0u8; REGION_HEADER_BYTES_LENGTH as usize])?;
            source_len = REGION_HEADER_BYTES_LENGTH;
        }

        let remainder = source_len % REGION_SECTOR_BYTES_LENGTH;

        if remainder != 0 {
            source.seek(SeekFrom::End(0))?;
            source.write_all(&vec![0u8; (REGION_SECTOR_BYTES_LENGTH - remainder) as usize])?;
            source_len += REGION_SECTOR_BYTES_LENGTH - remainder;
        }

        source.seek(SeekFrom::Start(0))?;

        let mut locations = [0u32; REGION_CHUNKS];
        let mut timestamps = [0u32; REGION_CHUNKS];

        for location in locations.iter_mut() {
            *location = source.read_u32::<BigEndian>()?;
        }

        for timestamp in timestamps.iter_mut() {
            *timestamp = source.read_u32::<BigEndian>()?;
        }

        let total_sectors = (source_len / REGION_SECTOR_BYTES_LENGTH) as usize;
        let free_sectors = free_sectors(total_sectors, &locations);

        Ok(RegionFile {
            position,
            io: Mutex::new(RegionIo {
                source,
                locations,
                timestamps,
                free_sectors,
            }),
            columns: Mutex::new(HashMap::new()),
        })
    }

    pub fn position(&self) -> RegionPosition {
        self.position
    }

    /// Consumes the region and returns the underlying source. Cached
    /// columns are discarded; call [`RegionFile::flush_cached_chunks`]
    /// first to persist them.
    pub fn into_source(self) -> S {
        self.io.into_inner().unwrap().source
    }

    fn chunk_index(&self, chunk_x: i32, chunk_z: i32) -> Result<usize, ChunkReadError> {
        if !self.position.contains_chunk(chunk_x, chunk_z) {
            return Err(ChunkReadError::ChunkOutOfRegion { chunk_x, chunk_z });
        }

        Ok(RegionChunkPosition::from_chunk_position(chunk_x, chunk_z).metadata_index())
    }

    /// Whether the chunk has a copy on disk.
    pub fn has_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<bool, ChunkReadError> {
        let index = self.chunk_index(chunk_x, chunk_z)?;

        Ok(self.io.lock().unwrap().locations[index] != 0)
    }

    /// Whether the chunk has a copy on disk or a cached column.
    pub fn has_loaded_chunk(&self, chunk_x: i32, chunk_z: i32) -> Result<bool, ChunkReadError> {
        let index = self.chunk_index(chunk_x, chunk_z)?;

        if self.columns.lock().unwrap().contains_key(&index) {
            return Ok(true);
        }

        Ok(self.io.lock().unwrap().locations[index] != 0)
    }

    /// Returns the cached or on-disk column at the absolute chunk
    /// coordinates, or `None` when the slot is empty.
    pub fn get_chunk(
        &self,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<Option<Arc<Mutex<ChunkColumn>>>, ChunkReadError> {
        let index = self.chunk_index(chunk_x, chunk_z)?;
        let mut columns = self.columns.lock().unwrap();

        if let Some(column) = columns.get(&index) {
            return Ok(Some(Arc::clone(column)));
        }

        let mut io = self.io.lock().unwrap();

        if io.locations[index] == 0 {
            return Ok(None);
        }

        let compound = io.read_compound(index)?;
        drop(io);

        let column = Arc::new(Mutex::new(ChunkColumn::from_nbt(compound)?));
        columns.insert(index, Arc::clone(&column));

        Ok(Some(column))
    }

    /// As [`RegionFile::get_chunk`], but an empty slot yields a fresh
    /// all-air column in the cache.
    pub fn get_or_create_chunk(
        &self,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<Arc<Mutex<ChunkColumn>>, ChunkReadError> {
        if let Some(column) = self.get_chunk(chunk_x, chunk_z)? {
            return Ok(column);
        }

        let index = self.chunk_index(chunk_x, chunk_z)?;
        let mut columns = self.columns.lock().unwrap();

        // Re-check under the lock; another caller may have created it.
        let column = columns
            .entry(index)
            .or_insert_with(|| Arc::new(Mutex::new(ChunkColumn::new(chunk_x, chunk_z))));

        Ok(Arc::clone(column))
    }

    /// Drops the cached column without writing it.
    pub fn forget(&self, chunk_x: i32, chunk_z: i32) -> Result<(), ChunkReadError> {
        let index = self.chunk_index(chunk_x, chunk_z)?;
        self.columns.lock().unwrap().remove(&index);

        Ok(())
    }

    /// Serializes the column and writes it into the first run of free
    /// sectors that fits, growing the file when none does.
    ///
    /// The previous copy is freed only after the header entry points at
    /// the new one, so a failure part-way leaves the old copy
    /// authoritative.
    pub fn write_column(&self, column: &ChunkColumn) -> Result<(), ChunkWriteError> {
        let (chunk_x, chunk_z) = (column.x(), column.z());

        if !self.position.contains_chunk(chunk_x, chunk_z) {
            return Err(ChunkWriteError::ChunkOutOfRegion { chunk_x, chunk_z });
        }

        let index = RegionChunkPosition::from_chunk_position(chunk_x, chunk_z).metadata_index();

        // Serialize and compress outside the io lock.
        let mut buffer = Vec::new();
        buffer.write_u8(ZLIB_COMPRESSION_TYPE)?;
        write_zlib_compound_tag(&mut buffer, &column.to_nbt()?)?;

        // 4 bytes for the length field.
        let data_size = buffer.len() + 4;
        let sector_count = data_size.div_ceil(REGION_SECTOR_BYTES_LENGTH as usize);

        if sector_count >= 256 {
            return Err(ChunkWriteError::LengthExceedsMaximum {
                length: data_size as u32,
            });
        }

        let mut io = self.io.lock().unwrap();
        let previous_location = io.locations[index];
        let start_sector = io.allocate(sector_count);

        debug!(
            target: "anvil-world",
            "Region {:?} chunk ({}, {}) takes {} sectors at {}",
            self.position, chunk_x, chunk_z, sector_count, start_sector
        );

        if let Err(io_error) = io.write_payload(start_sector, sector_count, &buffer) {
            // The header still points at the old copy; hand the new
            // sectors back.
            io.release(start_sector, sector_count);
            return Err(io_error.into());
        }

        let location = ((start_sector as u32) << 8) | sector_count as u32;

        if let Err(io_error) = io.store_header_entry(index, location, unix_timestamp()) {
            io.release(start_sector, sector_count);
            return Err(io_error.into());
        }

        if previous_location != 0 {
            io.release(
                (previous_location >> 8) as usize,
                (previous_location & 0xFF) as usize,
            );
        }

        Ok(())
    }

    /// Writes every cached column to the file, then empties the cache.
    pub fn flush_cached_chunks(&self) -> Result<(), ChunkWriteError> {
        let mut columns = self.columns.lock().unwrap();

        for column in columns.values() {
            let column = column.lock().unwrap();
            self.write_column(&column)?;
        }

        columns.clear();

        Ok(())
    }

    /// Block state at absolute block coordinates, read through the cache.
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> Result<BlockState, BlockAccessError> {
        let (chunk_x, chunk_z) = (block_to_chunk(x), block_to_chunk(z));

        let column = self
            .get_chunk(chunk_x, chunk_z)?
            .ok_or(BlockAccessError::ChunkNotPresent { chunk_x, chunk_z })?;

        let column = column.lock().unwrap();

        Ok(column.get_block_state(block_inside_chunk(x), y, block_inside_chunk(z))?)
    }

    /// Sets the block state at absolute block coordinates through the
    /// cache, creating the column when the slot is empty.
    pub fn set_block_state(
        &self,
        x: i32,
        y: i32,
        z: i32,
        state: BlockState,
    ) -> Result<(), BlockAccessError> {
        let (chunk_x, chunk_z) = (block_to_chunk(x), block_to_chunk(z));
        let column = self.get_or_create_chunk(chunk_x, chunk_z)?;
        let mut column = column.lock().unwrap();

        Ok(column.set_block_state(block_inside_chunk(x), y, block_inside_chunk(z), state)?)
    }

    /// Biome at absolute block coordinates, read through the cache.
    pub fn get_biome(&self, x: i32, y: i32, z: i32) -> Result<i32, BlockAccessError> {
        let (chunk_x, chunk_z) = (block_to_chunk(x), block_to_chunk(z));

        let column = self
            .get_chunk(chunk_x, chunk_z)?
            .ok_or(BlockAccessError::ChunkNotPresent { chunk_x, chunk_z })?;

        let column = column.lock().unwrap();

        Ok(column.get_biome(block_inside_chunk(x), y, block_inside_chunk(z))?)
    }

    /// Sets the biome volume containing the absolute block coordinates
    /// through the cache, creating the column when the slot is empty.
    pub fn set_biome(&self, x: i32, y: i32, z: i32, biome: i32) -> Result<(), BlockAccessError> {
        let (chunk_x, chunk_z) = (block_to_chunk(x), block_to_chunk(z));
        let column = self.get_or_create_chunk(chunk_x, chunk_z)?;
        let mut column = column.lock().unwrap();

        Ok(column.set_biome(block_inside_chunk(x), y, block_inside_chunk(z), biome)?)
    }
}

impl<S: Read + Seek> RegionIo<S> {
    fn read_compound(&mut self, index: usize) -> Result<CompoundTag, ChunkReadError> {
        let location = self.locations[index];
        let start_sector = (location >> 8) as u64;
        let sector_count = (location & 0xFF) as u32;

        let maximum_length =
            (sector_count * REGION_SECTOR_BYTES_LENGTH as u32).min(CHUNK_MAXIMUM_BYTES_LENGTH);

        self.source
            .seek(SeekFrom::Start(start_sector * REGION_SECTOR_BYTES_LENGTH))?;
        let length = self.source.read_u32::<BigEndian>()?;

        if length == 0 {
            return Err(ChunkReadError::MalformedLength { length });
        }

        if length > maximum_length {
            return Err(ChunkReadError::LengthExceedsMaximum {
                length,
                maximum_length,
            });
        }

        let compression_scheme = self.source.read_u8()?;
        let mut compressed_buffer = vec![0u8; (length - 1) as usize];
        self.source.read_exact(&mut compressed_buffer)?;

        let mut cursor = Cursor::new(&compressed_buffer);

        match compression_scheme {
            GZIP_COMPRESSION_TYPE => Ok(read_gzip_compound_tag(&mut cursor)?),
            ZLIB_COMPRESSION_TYPE => Ok(read_zlib_compound_tag(&mut cursor)?),
            compression_scheme => {
                Err(ChunkReadError::UnsupportedCompressionScheme { compression_scheme })
            }
        }
    }
}

impl<S: Write + Seek> RegionIo<S> {
    /// Claims the first run of `sector_count` consecutive free sectors,
    /// appending past the end of the file when no gap fits.
    ///
    /// The scan tracks a running free count, so a run ending exactly at
    /// the last sector is still found.
    fn allocate(&mut self, sector_count: usize) -> usize {
        let mut run_length = 0;

        for sector in 0..self.free_sectors.len() {
            if !self.free_sectors[sector] {
                run_length = 0;
                continue;
            }

            run_length += 1;

            if run_length == sector_count {
                let start_sector = sector + 1 - sector_count;

                for index in start_sector..=sector {
                    self.free_sectors.set(index, false);
                }

                return start_sector;
            }
        }

        let start_sector = self.free_sectors.len();

        for _ in 0..sector_count {
            self.free_sectors.push(false);
        }

        start_sector
    }

    /// Returns a sector run to the free map; ranges past the end of the
    /// map are tolerated.
    fn release(&mut self, start_sector: usize, sector_count: usize) {
        let end_index = (start_sector + sector_count).min(self.free_sectors.len());

        for index in start_sector.min(end_index)..end_index {
            self.free_sectors.set(index, true);
        }
    }

    /// Writes the length field, the payload and zero padding up to the
    /// sector boundary.
    fn write_payload(
        &mut self,
        start_sector: usize,
        sector_count: usize,
        buffer: &[u8],
    ) -> Result<(), io::Error> {
        self.source.seek(SeekFrom::Start(
            start_sector as u64 * REGION_SECTOR_BYTES_LENGTH,
        ))?;
        self.source.write_u32::<BigEndian>(buffer.len() as u32)?;
        self.source.write_all(buffer)?;

        let padding_len = sector_count * REGION_SECTOR_BYTES_LENGTH as usize - buffer.len() - 4;

        if padding_len > 0 {
            self.source.write_all(&vec![0u8; padding_len])?;
        }

        Ok(())
    }

    /// Persists one location and timestamp pair, then mirrors it in the
    /// in-memory tables.
    fn store_header_entry(
        &mut self,
        index: usize,
        location: u32,
        timestamp: u32,
    ) -> Result<(), io::Error> {
        self.source.seek(SeekFrom::Start(index as u64 * 4))?;
        self.source.write_u32::<BigEndian>(location)?;

        self.source.seek(SeekFrom::Start(
            REGION_SECTOR_BYTES_LENGTH + index as u64 * 4,
        ))?;
        self.source.write_u32::<BigEndian>(timestamp)?;

        self.locations[index] = location;
        self.timestamps[index] = timestamp;

        Ok(())
    }
}

/// Trait adds additional helper methods for `Seek`.
trait SeekExt {
    fn len(&mut self) -> Result<u64, io::Error>;
}

impl<S: Seek> SeekExt for S {
    fn len(&mut self) -> Result<u64, io::Error> {
        let old_pos = self.seek(SeekFrom::Current(0))?;
        self.seek(SeekFrom::Start(0))?;
        let len = self.seek(SeekFrom::End(0))?;

        if old_pos != len {
            self.seek(SeekFrom::Start(old_pos))?;
        }

        Ok(len)
    }
}
