use crate::buffer::FrameBuffer;
use crate::format::{Cell, Position, UpdateEntry};
use crate::{Error, Result};

/// Default linear RGB distance under which two colors count as the same.
pub const DEFAULT_COLOR_TOLERANCE: f32 = 0.05;

/// Visible terminal region in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Call-time parameters of a diff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffOptions {
    pub viewport: Viewport,
    /// Linear RGB distance threshold, same 0.0..=1.0 units as [`Color`](crate::format::Color).
    pub color_tolerance: f32,
    /// Scan the full extent of both buffers instead of stopping at the viewport.
    /// Meant for inspection, not for normal rendering.
    pub include_out_of_bounds: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            color_tolerance: DEFAULT_COLOR_TOLERANCE,
            include_out_of_bounds: false,
        }
    }
}

impl DiffOptions {
    pub fn new(viewport_width: u16, viewport_height: u16) -> Self {
        Self {
            viewport: Viewport::new(viewport_width, viewport_height),
            ..Self::default()
        }
    }

    pub fn with_color_tolerance(mut self, tolerance: f32) -> Self {
        self.color_tolerance = tolerance;
        self
    }

    pub fn with_include_out_of_bounds(mut self, include: bool) -> Self {
        self.include_out_of_bounds = include;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// The tolerance squared, after checking it is a non-negative number.
    pub fn tolerance_squared(&self) -> Result<f32> {
        let t = self.color_tolerance;
        if t.is_nan() || t < 0.0 {
            return Err(Error::InvalidTolerance(t));
        }
        Ok(t * t)
    }
}

/// Compute the updates that turn `previous` into `current`, erasing vanished
/// cells with [`Cell::blank`].
pub fn diff(
    previous: &FrameBuffer,
    current: &FrameBuffer,
    options: &DiffOptions,
) -> Result<Vec<UpdateEntry>> {
    diff_with(previous, current, options, Cell::blank)
}

/// Like [`diff`], but vanished cells are replaced by whatever `blank` builds
/// for their position.
///
/// Rows are scanned top to bottom, columns left to right, each up to the
/// longer of the two buffers and, unless `include_out_of_bounds` is set,
/// clipped to the viewport. A cell is emitted when it appears, disappears,
/// changes glyph, or moves at least `color_tolerance` away in RGB space.
/// The output is row-major with at most one entry per position.
pub fn diff_with<F>(
    previous: &FrameBuffer,
    current: &FrameBuffer,
    options: &DiffOptions,
    blank: F,
) -> Result<Vec<UpdateEntry>>
where
    F: Fn(Position) -> Cell,
{
    let tolerance_sq = options.tolerance_squared()?;
    let clip = !options.include_out_of_bounds;

    let mut scan_height = previous.height().max(current.height());
    if clip {
        scan_height = scan_height.min(options.viewport.height as usize);
    }

    let mut updates = Vec::new();

    for y in 0..scan_height {
        let prev_row = previous.row(y);
        let curr_row = current.row(y);

        let mut scan_width = prev_row.len().max(curr_row.len());
        if clip {
            scan_width = scan_width.min(options.viewport.width as usize);
        }

        for x in 0..scan_width {
            let prev_cell = prev_row.get(x).and_then(Option::as_ref);
            let curr_cell = curr_row.get(x).and_then(Option::as_ref);

            let needs_update = match (prev_cell, curr_cell) {
                (None, None) => false,
                (Some(_), None) | (None, Some(_)) => true,
                (Some(p), Some(c)) => {
                    p.glyph != c.glyph || p.color.distance_squared(&c.color) >= tolerance_sq
                }
            };

            if needs_update {
                // FrameBuffer keeps every index below MAX_EXTENT.
                let position = Position::new(x as u16, y as u16);
                let cell = match curr_cell {
                    Some(cell) => *cell,
                    None => blank(position),
                };
                updates.push(UpdateEntry::new(position, cell));
            }
        }
    }

    tracing::trace!(
        updates = updates.len(),
        include_out_of_bounds = options.include_out_of_bounds,
        "frame diff computed"
    );

    Ok(updates)
}
