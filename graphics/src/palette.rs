//! Palettes and palette index remaps
//!
//! A palette is a set of 256-color rows. Palette textures sample an index,
//! optionally pass it through a remap table, then look up the color in the
//! palette's current row.

use std::sync::{Arc, LazyLock};

use xxhash_rust::xxh3::xxh3_64;

/// Number of entries in one palette row and in one remap table
pub const PALETTE_SIZE: usize = 256;

/// Bytes per palette row (RGBA8)
pub const PALETTE_ROW_BYTES: usize = PALETTE_SIZE * 4;

static IDENTITY_REMAP: LazyLock<PaletteRemap> = LazyLock::new(|| {
    let mut table = [0u8; PALETTE_SIZE];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = i as u8;
    }
    PaletteRemap::new(table)
});

/// Palette index remap table with its content hash.
///
/// Cheap to clone; the table itself is shared.
#[derive(Debug, Clone)]
pub struct PaletteRemap {
    table: Arc<[u8; PALETTE_SIZE]>,
    hash: u64,
}

impl PaletteRemap {
    pub fn new(table: [u8; PALETTE_SIZE]) -> Self {
        let hash = xxh3_64(&table);
        Self {
            table: Arc::new(table),
            hash,
        }
    }

    /// The remap that maps every index to itself
    pub fn identity() -> Self {
        IDENTITY_REMAP.clone()
    }

    pub fn table(&self) -> &[u8; PALETTE_SIZE] {
        &self.table
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn get(&self, index: u8) -> u8 {
        self.table[index as usize]
    }
}

impl Default for PaletteRemap {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for PaletteRemap {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.table[..] == other.table[..]
    }
}

/// A palette as seen by the draw device.
///
/// Implementations may animate by changing the current row between frames;
/// the device keys its palette dictionary on [`Palette::row_hash`].
pub trait Palette {
    /// RGBA8 bytes of the current row, `PALETTE_ROW_BYTES` long
    fn current_row(&self) -> &[u8];

    /// Content hash of the current row
    fn row_hash(&self) -> u64 {
        xxh3_64(self.current_row())
    }

    /// Index remap applied before the palette lookup
    fn remap(&self) -> PaletteRemap {
        PaletteRemap::identity()
    }
}

pub type PaletteRef = Arc<dyn Palette>;
