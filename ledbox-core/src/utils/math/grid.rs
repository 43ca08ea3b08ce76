//! Grid addressing for a row-major LED matrix.
//!
//! The strip is wired row by row, so LED `i` sits at row `i / cols` and
//! column `i % cols`.
//!
//! # Example
//! ```rust
//! use ledbox_core::utils::math::grid::Grid;
//! let grid = Grid::MATRIX_5X5;
//! assert_eq!(grid.index_to_rowcol(12), (2, 2));
//! assert_eq!(grid.rowcol_to_index(1, 2), 7);
//! ```

/// Linear position of one LED / grid slot.
pub type CellIndex = usize;

/// Errors raised when building a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Rows or columns were zero.
    Empty,
    /// The grid has more cells than the caller's fixed capacity.
    TooLarge { cells: usize, capacity: usize },
}

/// Dimensions of a rectangular LED matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
}

impl Grid {
    /// The 5x5 matrix fitted to the demo board.
    pub const MATRIX_5X5: Grid = Grid { rows: 5, cols: 5 };

    pub fn new(
        rows: usize,
        cols: usize,
    ) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells (`rows * cols`).
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Fail unless the grid fits into `capacity` cells.
    pub fn fits(
        &self,
        capacity: usize,
    ) -> Result<(), GridError> {
        if self.cells() > capacity {
            return Err(GridError::TooLarge {
                cells: self.cells(),
                capacity,
            });
        }
        Ok(())
    }

    pub fn contains(
        &self,
        index: CellIndex,
    ) -> bool {
        index < self.cells()
    }

    /// Map a linear index to `(row, col)`.
    ///
    /// The index must be inside the grid.
    pub fn index_to_rowcol(
        &self,
        index: CellIndex,
    ) -> (usize, usize) {
        debug_assert!(self.contains(index), "cell {index} outside grid");
        (index / self.cols, index % self.cols)
    }

    /// Map `(row, col)` back to a linear index.
    ///
    /// Both coordinates must be in range; use [`Grid::offset`] when they may not be.
    pub fn rowcol_to_index(
        &self,
        row: usize,
        col: usize,
    ) -> CellIndex {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    /// Move `index` by a signed row/column delta.
    ///
    /// Returns `None` when the target falls outside `[0, rows) x [0, cols)`.
    pub fn offset(
        &self,
        index: CellIndex,
        d_row: isize,
        d_col: isize,
    ) -> Option<CellIndex> {
        let (row, col) = self.index_to_rowcol(index);
        let row = row.checked_add_signed(d_row)?;
        let col = col.checked_add_signed(d_col)?;
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.rowcol_to_index(row, col))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::MATRIX_5X5
    }
}
