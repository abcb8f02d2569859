use crate::position::RegionPosition;
use crate::region::RegionFile;
use log::debug;
use std::fs::{read_dir, File, OpenOptions};
use std::path::Path;
use std::{fs, io};

/// Source of region files for a dimension.
pub trait RegionProvider<S> {
    fn get_region(&self, position: RegionPosition) -> Result<RegionFile<S>, io::Error>;
}

/// Provides regions stored as `r.<x>.<z>.mca` files in one folder.
pub struct FolderRegionProvider<'a> {
    /// Folder where region files are located.
    folder_path: &'a Path,
}

impl<'a> FolderRegionProvider<'a> {
    pub fn new(folder: &'a str) -> FolderRegionProvider<'a> {
        let folder_path = Path::new(folder);

        FolderRegionProvider { folder_path }
    }

    /// Positions of the region files currently present in the folder.
    pub fn iter_positions(&self) -> Result<impl Iterator<Item = RegionPosition>, io::Error> {
        let positions: Vec<_> = read_dir(self.folder_path)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| RegionPosition::from_filename(&entry.path()).ok())
            .collect();

        Ok(positions.into_iter())
    }
}

impl<'a> RegionProvider<File> for FolderRegionProvider<'a> {
    fn get_region(&self, position: RegionPosition) -> Result<RegionFile<File>, io::Error> {
        if !self.folder_path.exists() {
            debug!(target: "anvil-world", "Creating region folder {:?}", self.folder_path);
            fs::create_dir(self.folder_path)?;
        }

        let region_path = self.folder_path.join(position.filename());

        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(region_path)?;

        RegionFile::load(position, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::BlockState;

    #[test]
    fn test_get_region_creates_folder_and_file() {
        let folder = tempfile::tempdir().unwrap();
        let folder_path = folder.path().join("region");
        let folder_str = folder_path.to_str().unwrap();

        let provider = FolderRegionProvider::new(folder_str);
        let region = provider.get_region(RegionPosition::new(1, -1)).unwrap();

        region
            .set_block_state(32 * 16 + 1, 70, -3, BlockState::new("minecraft:stone"))
            .unwrap();
        region.flush_cached_chunks().unwrap();

        assert!(folder_path.join("r.1.-1.mca").exists());

        // A second open sees the persisted chunk.
        let region = provider.get_region(RegionPosition::new(1, -1)).unwrap();

        assert_eq!(
            region.get_block_state(32 * 16 + 1, 70, -3).unwrap(),
            BlockState::new("minecraft:stone")
        );
    }

    #[test]
    fn test_iter_positions() {
        let folder = tempfile::tempdir().unwrap();
        let folder_str = folder.path().to_str().unwrap();

        std::fs::write(folder.path().join("r.0.0.mca"), b"").unwrap();
        std::fs::write(folder.path().join("r.-2.7.mca"), b"").unwrap();
        std::fs::write(folder.path().join("not-a-region.txt"), b"").unwrap();

        let provider = FolderRegionProvider::new(folder_str);
        let mut positions: Vec<_> = provider.iter_positions().unwrap().collect();
        positions.sort();

        assert_eq!(
            positions,
            [RegionPosition::new(-2, 7), RegionPosition::new(0, 0)]
        );
    }
}
