//! Shape algebra: packed boolean matrices, the tetromino catalog, and entity tags.

use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

const WORD_BITS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("shape matrix needs at least one row and one column (got {width}x{height})")]
    Empty { width: usize, height: usize },
    #[cfg(test)]
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[cfg(test)]
    #[error("invalid cell character {0:?}")]
    InvalidCell(char),
}

/// Rectangular grid of filled/empty cells. Each row is packed into `stride` u64 words,
/// so equality is word equality and row counts are popcounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeMatrix {
    width: usize,
    height: usize,
    stride: usize,
    bits: Vec<u64>,
}

impl ShapeMatrix {
    /// Zero-filled matrix. Rejects zero width or height.
    #[cfg(test)]
    pub fn new(width: usize, height: usize) -> Result<Self, ShapeError> {
        if width == 0 || height == 0 {
            return Err(ShapeError::Empty { width, height });
        }
        Ok(Self::zeroed(width, height))
    }

    fn zeroed(width: usize, height: usize) -> Self {
        let stride = width.div_ceil(WORD_BITS);
        Self {
            width,
            height,
            stride,
            bits: vec![0; stride * height],
        }
    }

    /// Zero-filled matrix for internal callers whose sizes come from existing shapes.
    /// Dimensions are clamped to at least 1.
    pub(crate) fn blank(width: usize, height: usize) -> Self {
        Self::zeroed(width.max(1), height.max(1))
    }

    /// 1x1 filled matrix.
    pub fn single_cell() -> Self {
        let mut shape = Self::zeroed(1, 1);
        shape.set(0, 0, true);
        shape
    }

    /// Tight matrix around `cells`; the smallest x and y become column/row 0.
    pub fn from_cells(cells: &[(usize, usize)]) -> Result<Self, ShapeError> {
        let (Some(min_x), Some(min_y)) = (
            cells.iter().map(|&(x, _)| x).min(),
            cells.iter().map(|&(_, y)| y).min(),
        ) else {
            return Err(ShapeError::Empty {
                width: 0,
                height: 0,
            });
        };
        let max_x = cells.iter().map(|&(x, _)| x).max().unwrap_or(min_x);
        let max_y = cells.iter().map(|&(_, y)| y).max().unwrap_or(min_y);
        let mut shape = Self::zeroed(max_x - min_x + 1, max_y - min_y + 1);
        for &(x, y) in cells {
            shape.set(x - min_x, y - min_y, true);
        }
        Ok(shape)
    }

    /// Parse rows of `#`/`1` (filled) and `.`/`0` (empty).
    #[cfg(test)]
    pub fn parse(rows: &[&str]) -> Result<Self, ShapeError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut shape = Self::new(width, height)?;
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(ShapeError::Ragged {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, c) in row.chars().enumerate() {
                match c {
                    '#' | '1' => shape.set(x, y, true),
                    '.' | '0' => {}
                    other => return Err(ShapeError::InvalidCell(other)),
                }
            }
        }
        Ok(shape)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn bit(&self, x: usize, y: usize) -> (usize, u64) {
        (y * self.stride + x / WORD_BITS, 1u64 << (x % WORD_BITS))
    }

    /// Out-of-range coordinates read as empty.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (word, mask) = self.bit(x, y);
        self.bits[word] & mask != 0
    }

    /// Out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, filled: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (word, mask) = self.bit(x, y);
        if filled {
            self.bits[word] |= mask;
        } else {
            self.bits[word] &= !mask;
        }
    }

    /// Signed lookup used by global-coordinate tests.
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }

    pub fn row_count(&self, y: usize) -> usize {
        if y >= self.height {
            return 0;
        }
        let start = y * self.stride;
        self.bits[start..start + self.stride]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    pub fn column_count(&self, x: usize) -> usize {
        (0..self.height).filter(|&y| self.get(x, y)).count()
    }

    pub fn filled_count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no cell is filled.
    pub fn is_blank(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// Filled cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.get(x, y))
    }

    /// Same dimensions, nothing filled.
    pub fn blank_like(&self) -> Self {
        Self::zeroed(self.width, self.height)
    }

    /// One clockwise quarter turn: width and height swap.
    pub fn rotated_cw(&self) -> Self {
        let mut out = Self::zeroed(self.height, self.width);
        for (x, y) in self.cells() {
            out.set(self.height - 1 - y, x, true);
        }
        out
    }

    /// `turns` clockwise quarter turns (taken mod 4).
    pub fn rotated(&self, turns: u8) -> Self {
        let mut out = self.clone();
        for _ in 0..turns % 4 {
            out = out.rotated_cw();
        }
        out
    }

    /// Matrix with the given row and column indices (original numbering) removed.
    /// `None` when every row or every column goes.
    pub fn without_lines(&self, rows: &[usize], cols: &[usize]) -> Option<Self> {
        let kept_rows: Vec<usize> = (0..self.height).filter(|y| !rows.contains(y)).collect();
        let kept_cols: Vec<usize> = (0..self.width).filter(|x| !cols.contains(x)).collect();
        if kept_rows.is_empty() || kept_cols.is_empty() {
            return None;
        }
        let mut out = Self::zeroed(kept_cols.len(), kept_rows.len());
        for (ny, &y) in kept_rows.iter().enumerate() {
            for (nx, &x) in kept_cols.iter().enumerate() {
                if self.get(x, y) {
                    out.set(nx, ny, true);
                }
            }
        }
        Some(out)
    }
}

impl fmt::Display for ShapeMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            if y > 0 {
                writeln!(f)?;
            }
            for x in 0..self.width {
                f.write_str(if self.get(x, y) { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

/// Tetromino kinds in catalog order (I, O, T, L, J, S, Z). The player's tag cycles in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl ShapeKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::L, Self::J, Self::S, Self::Z];

    /// 4 cells (x, y) of the catalog orientation.
    pub fn cells(&self) -> &'static [(usize, usize); 4] {
        match self {
            Self::I => &[(0, 0), (1, 0), (2, 0), (3, 0)],
            Self::O => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::T => &[(0, 0), (1, 0), (2, 0), (1, 1)],
            Self::L => &[(0, 0), (1, 0), (2, 0), (0, 1)],
            Self::J => &[(0, 0), (1, 0), (2, 0), (2, 1)],
            Self::S => &[(0, 0), (1, 0), (1, 1), (2, 1)],
            Self::Z => &[(1, 0), (2, 0), (0, 1), (1, 1)],
        }
    }

    /// Catalog matrix for this kind.
    pub fn matrix(&self) -> ShapeMatrix {
        let cells = self.cells();
        let width = cells.iter().map(|&(x, _)| x).max().unwrap_or(0) + 1;
        let height = cells.iter().map(|&(_, y)| y).max().unwrap_or(0) + 1;
        let mut shape = ShapeMatrix::zeroed(width, height);
        for &(x, y) in cells {
            shape.set(x, y, true);
        }
        shape
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(&self) -> char {
        match self {
            Self::I => 'I',
            Self::O => 'O',
            Self::T => 'T',
            Self::L => 'L',
            Self::J => 'J',
            Self::S => 'S',
            Self::Z => 'Z',
        }
    }
}

/// Identity marker on an entity: a catalog kind or the merged-cluster tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Shape(ShapeKind),
    Cluster,
}

impl Tag {
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster)
    }
}

impl From<ShapeKind> for Tag {
    fn from(kind: ShapeKind) -> Self {
        Self::Shape(kind)
    }
}

/// The seven catalog entries, built once.
#[derive(Debug, Clone)]
pub struct ShapeCatalog {
    entries: Vec<(ShapeMatrix, ShapeKind)>,
}

static CATALOG: LazyLock<ShapeCatalog> = LazyLock::new(ShapeCatalog::build);

impl ShapeCatalog {
    fn build() -> Self {
        Self {
            entries: ShapeKind::ALL.iter().map(|k| (k.matrix(), *k)).collect(),
        }
    }

    pub fn standard() -> &'static Self {
        &CATALOG
    }

    /// Exact orientation match only: same dimensions, same cells. No rotation or reflection.
    pub fn match_shape(&self, shape: &ShapeMatrix) -> Option<ShapeKind> {
        self.entries
            .iter()
            .find(|(m, _)| m == shape)
            .map(|(_, kind)| *kind)
    }
}
