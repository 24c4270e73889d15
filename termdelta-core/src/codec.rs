//! Frame payload encoding: update lists as run-length command bytes.
//!
//! Each run starts with a command byte whose flags say which fields follow,
//! in this order:
//!
//! | flag     | bytes                        |
//! |----------|------------------------------|
//! | `COORDS` | x: u16 LE, y: u16 LE         |
//! | `RGB`    | r, g, b (0-255)              |
//! | `BG`     | background r, g, b (0-255)   |
//! | `CHAR`   | len: u8, then UTF-8 bytes    |
//! | `RLE`    | run count: u16 LE            |
//! | `NO_BG`  | none: background cleared     |
//!
//! Coordinates are left out when a run continues right after the previous one
//! on the same row, colors and glyph when they repeat the previous run's.
//! Runs start without a background, so `NO_BG` only follows a run that had one.
//! State starts fresh in every payload so each frame decodes on its own.

use crate::format::{Cell, Color, Position, UpdateEntry};
use crate::{Error, Result};

pub const CMD_COORDS: u8 = 0x01;
pub const CMD_RGB: u8 = 0x02;
pub const CMD_BG: u8 = 0x04;
pub const CMD_CHAR: u8 = 0x08;
pub const CMD_RLE: u8 = 0x10;
pub const CMD_NO_BG: u8 = 0x20;

const MAX_RUN: usize = u16::MAX as usize;

#[derive(Default)]
struct RunState {
    /// Position of the last cell of the previous run.
    last: Option<Position>,
    color: Option<[u8; 3]>,
    background: Option<[u8; 3]>,
    glyph: Option<char>,
}

impl RunState {
    fn continues(&self, position: Position) -> bool {
        self.last
            .is_some_and(|last| last.y == position.y && u32::from(last.x) + 1 == u32::from(position.x))
    }
}

/// Encode an update list. Colors are quantized to 0-255.
pub fn encode_updates(updates: &[UpdateEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(updates.len() * 4);
    let mut state = RunState::default();

    let mut i = 0;
    while i < updates.len() {
        let first = &updates[i];
        let color = first.cell.color.to_bytes();
        let background = first.cell.background.map(|c| c.to_bytes());
        let glyph = first.cell.glyph;

        let mut run = 1;
        while i + run < updates.len() && run < MAX_RUN {
            let next = &updates[i + run];
            let expected_x = u32::from(first.position.x) + run as u32;
            if next.position.y != first.position.y
                || u32::from(next.position.x) != expected_x
                || next.cell.glyph != glyph
                || next.cell.color.to_bytes() != color
                || next.cell.background.map(|c| c.to_bytes()) != background
            {
                break;
            }
            run += 1;
        }

        let mut cmd = 0u8;
        let needs_coords = !state.continues(first.position);
        if needs_coords {
            cmd |= CMD_COORDS;
        }
        if state.color != Some(color) {
            cmd |= CMD_RGB;
        }
        if state.background != background {
            cmd |= if background.is_some() { CMD_BG } else { CMD_NO_BG };
        }
        if state.glyph != Some(glyph) {
            cmd |= CMD_CHAR;
        }
        if run > 1 {
            cmd |= CMD_RLE;
        }

        buf.push(cmd);
        if cmd & CMD_COORDS != 0 {
            buf.extend_from_slice(&first.position.x.to_le_bytes());
            buf.extend_from_slice(&first.position.y.to_le_bytes());
        }
        if cmd & CMD_RGB != 0 {
            buf.extend_from_slice(&color);
            state.color = Some(color);
        }
        if let (true, Some(bg)) = (cmd & CMD_BG != 0, background) {
            buf.extend_from_slice(&bg);
        }
        state.background = background;
        if cmd & CMD_CHAR != 0 {
            let mut utf8 = [0u8; 4];
            let bytes = glyph.encode_utf8(&mut utf8).as_bytes();
            buf.push(bytes.len() as u8);
            buf.extend_from_slice(bytes);
            state.glyph = Some(glyph);
        }
        if cmd & CMD_RLE != 0 {
            buf.extend_from_slice(&(run as u16).to_le_bytes());
        }

        // run fits on the row: x values came from distinct u16 positions
        state.last = Some(Position::new(first.position.x + (run - 1) as u16, first.position.y));
        i += run;
    }

    buf
}

/// Decode a payload produced by [`encode_updates`]. Each decoded cell's
/// position is the position of its entry.
pub fn decode_updates(payload: &[u8]) -> Result<Vec<UpdateEntry>> {
    let mut reader = ByteReader { buf: payload, pos: 0 };
    let mut state = RunState::default();
    let mut updates = Vec::new();

    while !reader.is_empty() {
        let cmd = reader.u8()?;

        let start = if cmd & CMD_COORDS != 0 {
            Position::new(reader.u16()?, reader.u16()?)
        } else {
            let last = state.last.ok_or(Error::Malformed("run without coordinates"))?;
            let x = last.x.checked_add(1).ok_or(Error::Malformed("run past last column"))?;
            Position::new(x, last.y)
        };

        if cmd & CMD_RGB != 0 {
            let rgb = reader.take(3)?;
            state.color = Some([rgb[0], rgb[1], rgb[2]]);
        }
        match (cmd & CMD_BG != 0, cmd & CMD_NO_BG != 0) {
            (true, true) => return Err(Error::Malformed("background both set and cleared")),
            (true, false) => {
                let rgb = reader.take(3)?;
                state.background = Some([rgb[0], rgb[1], rgb[2]]);
            }
            (false, true) => state.background = None,
            (false, false) => {}
        }
        if cmd & CMD_CHAR != 0 {
            let len = reader.u8()? as usize;
            let bytes = reader.take(len)?;
            let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidGlyph)?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => state.glyph = Some(c),
                _ => return Err(Error::InvalidGlyph),
            }
        }
        let run = if cmd & CMD_RLE != 0 { reader.u16()? } else { 1 };
        if run == 0 {
            return Err(Error::Malformed("zero-length run"));
        }

        let color = state.color.ok_or(Error::Malformed("run without color"))?;
        let glyph = state.glyph.ok_or(Error::Malformed("run without glyph"))?;
        let color = Color::from_bytes(color);
        let background = state.background.map(Color::from_bytes);

        let last_x = start
            .x
            .checked_add(run - 1)
            .ok_or(Error::Malformed("run past last column"))?;
        for x in start.x..=last_x {
            let position = Position::new(x, start.y);
            let cell = Cell {
                background,
                ..Cell::new(glyph, color, position)
            };
            updates.push(UpdateEntry::new(position, cell));
        }
        state.last = Some(Position::new(last_x, start.y));
    }

    Ok(updates)
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(Error::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(glyph: char, rgb: [u8; 3], x: u16, y: u16) -> UpdateEntry {
        let position = Position::new(x, y);
        UpdateEntry::new(position, Cell::new(glyph, Color::from_bytes(rgb), position))
    }

    #[test]
    fn identical_neighbours_collapse_into_one_run() {
        let updates: Vec<_> = (0..5).map(|x| entry('#', [10, 20, 30], x, 3)).collect();
        let payload = encode_updates(&updates);
        // cmd + coords + rgb + (len + 1 byte glyph) + run
        assert_eq!(payload.len(), 1 + 4 + 3 + 2 + 2);
        assert_eq!(payload[0], CMD_COORDS | CMD_RGB | CMD_CHAR | CMD_RLE);
        assert_eq!(decode_updates(&payload).unwrap(), updates);
    }

    #[test]
    fn repeated_fields_are_omitted() {
        let updates = vec![
            entry('a', [1, 2, 3], 0, 0),
            entry('b', [1, 2, 3], 1, 0),
            entry('b', [9, 9, 9], 5, 0),
        ];
        let payload = encode_updates(&updates);
        assert_eq!(payload[0], CMD_COORDS | CMD_RGB | CMD_CHAR);
        // second run continues the first: only the glyph changes
        assert_eq!(payload[1 + 4 + 3 + 2], CMD_CHAR);
        assert_eq!(decode_updates(&payload).unwrap(), updates);
    }

    #[test]
    fn background_colors_split_runs_and_decode() {
        let shaded = |x, bg: [u8; 3]| {
            let mut e = entry('▀', [200, 0, 0], x, 0);
            e.cell = e.cell.with_background(Color::from_bytes(bg));
            e
        };
        let updates = vec![
            shaded(0, [0, 0, 90]),
            shaded(1, [0, 0, 90]),
            shaded(2, [0, 90, 0]),
            entry('▀', [200, 0, 0], 3, 0),
        ];
        let payload = encode_updates(&updates);
        // bg 90 run of two, then a bg change, then a cleared background
        assert_eq!(payload[0], CMD_COORDS | CMD_RGB | CMD_BG | CMD_CHAR | CMD_RLE);
        let second = 1 + 4 + 3 + 3 + 4 + 2;
        assert_eq!(payload[second], CMD_BG);
        assert_eq!(payload[second + 4], CMD_NO_BG);
        assert_eq!(payload.len(), second + 5);

        let decoded = decode_updates(&payload).unwrap();
        assert_eq!(decoded, updates);
        assert_eq!(decoded[2].cell.background, Some(Color::from_bytes([0, 90, 0])));
        assert_eq!(decoded[3].cell.background, None);

        assert!(matches!(
            decode_updates(&[CMD_COORDS | CMD_BG | CMD_NO_BG, 0, 0, 0, 0]),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn multibyte_glyphs_and_row_changes() {
        let updates = vec![entry('▄', [255, 0, 0], 7, 1), entry('▄', [255, 0, 0], 0, 2)];
        let decoded = decode_updates(&encode_updates(&updates)).unwrap();
        assert_eq!(decoded, updates);
    }

    #[test]
    fn run_at_last_column() {
        let updates = vec![entry('z', [0, 0, 0], u16::MAX - 1, 0), entry('z', [0, 0, 0], u16::MAX, 0)];
        assert_eq!(decode_updates(&encode_updates(&updates)).unwrap(), updates);
    }

    #[test]
    fn empty_payload_is_empty_update_list() {
        assert!(encode_updates(&[]).is_empty());
        assert!(decode_updates(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_and_malformed_payloads_fail() {
        let payload = encode_updates(&[entry('q', [1, 1, 1], 2, 2)]);
        for cut in 1..payload.len() {
            assert!(matches!(decode_updates(&payload[..cut]), Err(Error::Truncated)));
        }

        assert!(matches!(decode_updates(&[CMD_RGB, 1, 2, 3]), Err(Error::Malformed(_))));
        assert!(matches!(
            decode_updates(&[CMD_COORDS | CMD_CHAR, 0, 0, 0, 0, 1, b'x']),
            Err(Error::Malformed("run without color"))
        ));
        assert!(matches!(
            decode_updates(&[CMD_COORDS | CMD_RGB | CMD_CHAR, 0, 0, 0, 0, 1, 1, 1, 2, b'x', b'y']),
            Err(Error::InvalidGlyph)
        ));
    }

    proptest! {
        #[test]
        fn prop_row_major_updates_decode_unchanged(
            raw in prop::collection::btree_map(
                (0u16..4, 0u16..12),
                (prop::sample::select(vec!['a', 'b', '█', ' ']), 0u8..3, proptest::option::of(0u8..3)),
                0..40,
            )
        ) {
            let shades = [[0, 0, 0], [255, 128, 0], [40, 40, 40]];
            // btree order over (y, x) is row-major
            let updates: Vec<_> = raw
                .into_iter()
                .map(|((y, x), (glyph, shade, bg))| {
                    let mut e = entry(glyph, shades[shade as usize], x, y);
                    e.cell.background = bg.map(|b| Color::from_bytes(shades[b as usize]));
                    e
                })
                .collect();
            prop_assert_eq!(decode_updates(&encode_updates(&updates)).unwrap(), updates);
        }
    }
}
