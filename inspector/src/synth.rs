use termdelta_core::{Cell, Color, FrameBuffer, Position};

const RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Synthetic test animation: a diagonal wave sweeping across the grid.
///
/// Cells whose brightness falls to zero are left absent, so the animation
/// exercises appearance and erasure as well as glyph and color changes.
pub fn wave_frame(cols: u16, rows: u16, t: u32) -> FrameBuffer {
    let mut frame = FrameBuffer::new();
    let mut cells = Vec::with_capacity(cols as usize * rows as usize);

    for y in 0..rows {
        for x in 0..cols {
            let phase = (x as f32 + y as f32 * 2.0 - t as f32 * 0.7) * 0.35;
            let level = (phase.sin() + 1.0) * 0.5;
            let idx = (level * (RAMP.len() - 1) as f32).round() as usize;
            if idx == 0 {
                continue;
            }
            let color = Color::rgb(level, 0.3 + 0.4 * (1.0 - level), 1.0 - level);
            cells.push(Cell::new(RAMP[idx], color, Position::new(x, y)));
        }
    }

    frame.write(&cells);
    frame
}
