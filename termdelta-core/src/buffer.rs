use crate::format::{Cell, Position, UpdateEntry};
use crate::{Error, Result};

/// Largest row count / row length whose indices still fit a `Position`.
pub const MAX_EXTENT: usize = u16::MAX as usize + 1;

/// One rendered frame: rows of optional cells.
///
/// Rows may have different lengths. Anything past the end of a row, or past
/// the last row, reads as absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameBuffer {
    rows: Vec<Vec<Option<Cell>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `width` x `height` buffer with every cell absent.
    pub fn with_size(width: u16, height: u16) -> Self {
        let mut buffer = Self::new();
        buffer.grow(width as usize, height as usize);
        buffer
    }

    /// Wrap existing (possibly jagged) rows.
    pub fn from_rows(rows: Vec<Vec<Option<Cell>>>) -> Result<Self> {
        if rows.len() > MAX_EXTENT {
            return Err(Error::TooLarge(rows.len()));
        }
        if let Some(row) = rows.iter().find(|r| r.len() > MAX_EXTENT) {
            return Err(Error::TooLarge(row.len()));
        }
        Ok(Self { rows })
    }

    /// Place each cell at its own position, growing as needed.
    /// Returns the positions that already held a cell, in write order.
    pub fn write(&mut self, cells: &[Cell]) -> Vec<Position> {
        let mut overwritten = Vec::new();
        for cell in cells {
            let Position { x, y } = cell.position;
            let (x, y) = (x as usize, y as usize);
            self.grow(x + 1, y + 1);
            let slot = &mut self.rows[y][x];
            if slot.is_some() {
                overwritten.push(cell.position);
            }
            *slot = Some(*cell);
        }
        overwritten
    }

    /// Extend to at least `height` rows, each at least `width` long. Never shrinks.
    pub fn grow_to_fit(&mut self, width: usize, height: usize) -> Result<()> {
        if width > MAX_EXTENT {
            return Err(Error::TooLarge(width));
        }
        if height > MAX_EXTENT {
            return Err(Error::TooLarge(height));
        }
        self.grow(width, height);
        Ok(())
    }

    /// Extend to at least `y + 1` rows and row `y` alone to at least `width`.
    /// Other rows keep their length.
    pub fn grow_row(&mut self, y: usize, width: usize) -> Result<()> {
        if width > MAX_EXTENT {
            return Err(Error::TooLarge(width));
        }
        if y >= MAX_EXTENT {
            return Err(Error::TooLarge(y + 1));
        }
        if y >= self.rows.len() {
            self.rows.resize_with(y + 1, Vec::new);
        }
        let row = &mut self.rows[y];
        if width > row.len() {
            row.resize(width, None);
        }
        Ok(())
    }

    fn grow(&mut self, width: usize, height: usize) {
        if height > self.rows.len() {
            self.rows.resize_with(height, Vec::new);
        }
        for row in &mut self.rows {
            if width > row.len() {
                row.resize(width, None);
            }
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.rows.get(y)?.get(x)?.as_ref()
    }

    /// Row `y`, or an empty slice past the last row.
    pub fn row(&self, y: usize) -> &[Option<Cell>] {
        self.rows.get(y).map_or(&[], Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<Option<Cell>>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Write every entry's cell at its position. Entries are applied in
    /// order; the first one outside the current extent stops the apply.
    pub fn apply(&mut self, updates: &[UpdateEntry]) -> Result<()> {
        for entry in updates {
            let (x, y) = (entry.position.x as usize, entry.position.y as usize);
            if x >= self.row(y).len() {
                return Err(Error::OutOfBounds {
                    position: entry.position,
                    width: self.width(),
                    height: self.height(),
                });
            }
            self.rows[y][x] = Some(entry.cell);
        }
        Ok(())
    }

    /// Every present cell as an update, row-major. A full redraw.
    pub fn to_updates(&self) -> Vec<UpdateEntry> {
        let mut updates = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(cell) = cell {
                    updates.push(UpdateEntry::new(Position::new(x as u16, y as u16), *cell));
                }
            }
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Color;

    fn cell(glyph: char, x: u16, y: u16) -> Cell {
        Cell::new(glyph, Color::WHITE, Position::new(x, y))
    }

    #[test]
    fn write_grows_and_reports_overwrites() {
        let mut buffer = FrameBuffer::new();
        let overwritten = buffer.write(&[cell('a', 2, 1), cell('b', 0, 0)]);
        assert!(overwritten.is_empty());
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.width(), 3);
        assert_eq!(buffer.get(2, 1).map(|c| c.glyph), Some('a'));
        assert!(buffer.get(1, 1).is_none());

        let overwritten = buffer.write(&[cell('c', 2, 1), cell('d', 1, 0)]);
        assert_eq!(overwritten, vec![Position::new(2, 1)]);
        assert_eq!(buffer.get(2, 1).map(|c| c.glyph), Some('c'));
    }

    #[test]
    fn grow_to_fit_never_shrinks() {
        let mut buffer = FrameBuffer::with_size(4, 3);
        buffer.grow_to_fit(2, 1).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (4, 3));
        buffer.grow_to_fit(6, 3).unwrap();
        assert!(buffer.rows().iter().all(|r| r.len() == 6));
        assert!(matches!(buffer.grow_to_fit(MAX_EXTENT + 1, 1), Err(Error::TooLarge(_))));
    }

    #[test]
    fn grow_row_leaves_other_rows_alone() {
        let mut buffer = FrameBuffer::with_size(2, 1);
        buffer.grow_row(3, 40).unwrap();
        assert_eq!(buffer.height(), 4);
        assert_eq!(buffer.row(0).len(), 2);
        assert_eq!(buffer.row(2).len(), 0);
        assert_eq!(buffer.row(3).len(), 40);
        assert!(matches!(buffer.grow_row(MAX_EXTENT, 1), Err(Error::TooLarge(_))));
    }

    #[test]
    fn jagged_reads_are_absent() {
        let buffer = FrameBuffer::from_rows(vec![
            vec![Some(cell('x', 0, 0))],
            vec![],
        ])
        .unwrap();
        assert_eq!(buffer.row(1).len(), 0);
        assert!(buffer.row(7).is_empty());
        assert!(buffer.get(5, 0).is_none());
        assert!(buffer.get(0, 9).is_none());
    }

    #[test]
    fn apply_rejects_out_of_bounds() {
        let mut buffer = FrameBuffer::with_size(2, 2);
        let updates = [
            UpdateEntry::new(Position::new(1, 1), cell('k', 1, 1)),
            UpdateEntry::new(Position::new(5, 0), cell('z', 5, 0)),
        ];
        let err = buffer.apply(&updates).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { width: 2, height: 2, .. }));
        // entries before the failing one stay applied
        assert_eq!(buffer.get(1, 1).map(|c| c.glyph), Some('k'));
    }

    #[test]
    fn to_updates_is_row_major_and_skips_absent() {
        let mut buffer = FrameBuffer::new();
        buffer.write(&[cell('b', 1, 1), cell('a', 3, 0), cell('c', 0, 1)]);
        let positions: Vec<_> = buffer.to_updates().iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![Position::new(3, 0), Position::new(0, 1), Position::new(1, 1)]);
    }
}
