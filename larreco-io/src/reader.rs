//! Memory-mapped row files.
//!
//! A row file is a flat sequence of little-endian `i64` cells, `width` cells
//! per row, with no header. Rows are decoded on demand through a
//! [`RowLayout`], so the file is never copied into memory.

use crate::{Error, Result};
use larreco_core::{HitSource, RawRow, RowLayout};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CELL_BYTES: usize = std::mem::size_of::<i64>();

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
#[derive(Clone)]
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Hit source over a memory-mapped row file.
#[derive(Clone)]
pub struct MappedRowSource {
    reader: MappedFileReader,
    width: usize,
    rows: usize,
    layout: RowLayout,
}

impl MappedRowSource {
    /// Opens a row file whose rows use the default twelve-column layout.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or its size is not a
    /// whole number of rows.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let layout = RowLayout::default();
        Self::open_with_layout(path, layout.width(), layout)
    }

    /// Opens a row file of `width` cells per row decoded with `layout`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if `width` is narrower than the
    /// layout or the file size is not a multiple of the row size.
    pub fn open_with_layout<P: AsRef<Path>>(
        path: P,
        width: usize,
        layout: RowLayout,
    ) -> Result<Self> {
        if width == 0 || width < layout.width() {
            return Err(Error::InvalidFormat(format!(
                "row width {width} is narrower than layout width {}",
                layout.width()
            )));
        }

        let reader = MappedFileReader::open(path)?;
        let row_bytes = width * CELL_BYTES;
        if reader.len() % row_bytes != 0 {
            return Err(Error::InvalidFormat(format!(
                "{}: size {} is not a multiple of the {row_bytes}-byte row",
                reader.path().display(),
                reader.len()
            )));
        }

        let rows = reader.len() / row_bytes;
        debug!("mapped {rows} rows of width {width} from {}", reader.path().display());
        Ok(Self {
            reader,
            width,
            rows,
            layout,
        })
    }

    /// Number of cells per row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Column layout used for decoding.
    #[must_use]
    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Returns the path of the mapped file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    fn cells(&self, index: usize) -> Vec<i64> {
        let row_bytes = self.width * CELL_BYTES;
        let start = index * row_bytes;
        self.reader.as_bytes()[start..start + row_bytes]
            .chunks_exact(CELL_BYTES)
            .map(|chunk| {
                let mut cell = [0u8; CELL_BYTES];
                cell.copy_from_slice(chunk);
                i64::from_le_bytes(cell)
            })
            .collect()
    }
}

impl HitSource for MappedRowSource {
    fn len(&self) -> usize {
        self.rows
    }

    fn get_row(&self, index: usize) -> larreco_core::Result<Option<RawRow>> {
        if index >= self.rows {
            return Ok(None);
        }
        self.layout.decode(&self.cells(index)).map(Some)
    }
}

/// Encodes rows of `i64` cells into the row-file byte format.
#[must_use]
pub fn encode_rows<R: AsRef<[i64]>>(rows: &[R]) -> Vec<u8> {
    rows.iter()
        .flat_map(|row| row.as_ref().iter().flat_map(|cell| cell.to_le_bytes()))
        .collect()
}
