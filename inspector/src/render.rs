use termdelta_core::FrameBuffer;

/// Render a frame buffer as plain text, one line per row.
/// Absent cells print as spaces; trailing spaces are trimmed.
pub fn render_text(frame: &FrameBuffer, buf: &mut String) {
    buf.clear();
    for y in 0..frame.height() {
        let start = buf.len();
        for cell in frame.row(y) {
            buf.push(cell.map_or(' ', |c| c.glyph));
        }
        let trimmed = buf[start..].trim_end_matches(' ').len();
        buf.truncate(start + trimmed);
        buf.push('\n');
    }
}
