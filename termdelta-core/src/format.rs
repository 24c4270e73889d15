/// Zero-based cell coordinate: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// RGB color with every channel on the 0.0..=1.0 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 0-255 channels.
    pub fn from_bytes(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
        }
    }

    /// Quantize to 0-255 channels, rounding to nearest and clamping out-of-range values.
    pub fn to_bytes(&self) -> [u8; 3] {
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Squared Euclidean distance in RGB space.
    #[inline]
    pub fn distance_squared(&self, other: &Color) -> f32 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        dr * dr + dg * dg + db * db
    }
}

fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A single terminal cell: glyph + foreground color at a position, with an
/// optional background color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub glyph: char,
    pub color: Color,
    pub position: Position,
    /// `None` leaves the terminal's own background showing.
    pub background: Option<Color>,
}

impl Cell {
    pub const fn new(glyph: char, color: Color, position: Position) -> Self {
        Self {
            glyph,
            color,
            position,
            background: None,
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Space in black: what an erased cell is redrawn as.
    pub const fn blank(position: Position) -> Self {
        Self::new(' ', Color::BLACK, position)
    }

    /// Lay out `text` left to right starting at `start`, one cell per char.
    /// Characters that would land past column `u16::MAX` are dropped.
    pub fn run(text: &str, color: Color, start: Position) -> Vec<Cell> {
        text.chars()
            .zip(start.x..=u16::MAX)
            .map(|(glyph, x)| Cell::new(glyph, color, Position::new(x, start.y)))
            .collect()
    }
}

/// One instruction for the renderer: draw `cell` at `position`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateEntry {
    pub position: Position,
    pub cell: Cell,
}

impl UpdateEntry {
    pub const fn new(position: Position, cell: Cell) -> Self {
        Self { position, cell }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Keyframe = 0,
    Delta = 1,
}

impl FrameType {
    pub fn from_u8(v: u8) -> crate::Result<Self> {
        match v {
            0 => Ok(FrameType::Keyframe),
            1 => Ok(FrameType::Delta),
            _ => Err(crate::Error::Malformed("unknown frame type")),
        }
    }
}

pub const MAGIC: &[u8; 4] = b"TDLT";
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 32;

/// Stream header, fixed 32 bytes at the start of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    // magic: [u8; 4] = "TDLT"
    // version: u16
    pub cols: u16,
    pub rows: u16,
    pub fps: u16,
    pub frame_count: u32,
    pub index_offset: u64,
    /// One past the furthest column any frame addresses; at least `cols`.
    pub extent_cols: u32,
    /// One past the furthest row any frame addresses; at least `rows`.
    pub extent_rows: u32,
}

impl StreamHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&VERSION.to_le_bytes());
        buf[6..8].copy_from_slice(&self.cols.to_le_bytes());
        buf[8..10].copy_from_slice(&self.rows.to_le_bytes());
        buf[10..12].copy_from_slice(&self.fps.to_le_bytes());
        buf[12..16].copy_from_slice(&self.frame_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[24..28].copy_from_slice(&self.extent_cols.to_le_bytes());
        buf[28..32].copy_from_slice(&self.extent_rows.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> crate::Result<Self> {
        if &buf[0..4] != MAGIC {
            return Err(crate::Error::InvalidMagic);
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != VERSION {
            return Err(crate::Error::UnsupportedVersion(version));
        }
        Ok(Self {
            cols: u16::from_le_bytes([buf[6], buf[7]]),
            rows: u16::from_le_bytes([buf[8], buf[9]]),
            fps: u16::from_le_bytes([buf[10], buf[11]]),
            frame_count: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            index_offset: le_u64(&buf[16..24]),
            extent_cols: u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]),
            extent_rows: u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]),
        })
    }

    /// Columns and rows a reader may address: the grid, widened by the
    /// recorded extent of out-of-bounds frames.
    pub fn addressable(&self) -> (usize, usize) {
        let cols = (self.extent_cols as usize).max(self.cols as usize);
        let rows = (self.extent_rows as usize).max(self.rows as usize);
        (cols, rows)
    }
}

/// One entry in the frame index at the end of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameIndexEntry {
    pub offset: u64,
    pub compressed_size: u32,
    pub frame_type: FrameType,
}

impl FrameIndexEntry {
    pub const SIZE: usize = 16;

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[12] = self.frame_type as u8;
        // bytes 13..16 reserved
        buf
    }

    pub fn from_bytes(buf: &[u8; 16]) -> crate::Result<Self> {
        Ok(Self {
            offset: le_u64(&buf[0..8]),
            compressed_size: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            frame_type: FrameType::from_u8(buf[12])?,
        })
    }
}

fn le_u64(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_le_bytes(raw)
}
