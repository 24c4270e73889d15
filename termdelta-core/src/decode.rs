use std::io::{Read, Seek, SeekFrom};

use crate::buffer::FrameBuffer;
use crate::codec::decode_updates;
use crate::compress;
use crate::format::*;
use crate::{Error, Result};

/// Reads update streams.
pub struct StreamReader<R: Read + Seek> {
    reader: R,
    pub header: StreamHeader,
    pub index: Vec<FrameIndexEntry>,
}

impl<R: Read + Seek> StreamReader<R> {
    /// Open and parse header + index.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header_buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buf)?;
        let header = StreamHeader::from_bytes(&header_buf)?;

        reader.seek(SeekFrom::Start(header.index_offset))?;
        let mut index = Vec::with_capacity(header.frame_count as usize);
        for _ in 0..header.frame_count {
            let mut entry_buf = [0u8; FrameIndexEntry::SIZE];
            reader.read_exact(&mut entry_buf)?;
            index.push(FrameIndexEntry::from_bytes(&entry_buf)?);
        }

        tracing::debug!(
            cols = header.cols,
            rows = header.rows,
            frames = header.frame_count,
            "stream opened"
        );
        Ok(Self { reader, header, index })
    }

    /// Read and decompress a single frame by index. Returns the raw payload.
    pub fn read_frame_raw(&mut self, frame_idx: usize) -> Result<Vec<u8>> {
        let entry = *self.index.get(frame_idx).ok_or(Error::FrameIndex(frame_idx))?;
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.reader.read_exact(&mut compressed)?;
        compress::decompress(&compressed)
    }

    /// Read a frame as its update list.
    pub fn read_frame(&mut self, frame_idx: usize) -> Result<Vec<UpdateEntry>> {
        let raw = self.read_frame_raw(frame_idx)?;
        decode_updates(&raw)
    }

    /// Reconstruct the screen as it looks after frame `frame_idx`: start at
    /// the closest keyframe at or before it and apply every frame up to it.
    pub fn replay(&mut self, frame_idx: usize) -> Result<FrameBuffer> {
        if frame_idx >= self.index.len() {
            return Err(Error::FrameIndex(frame_idx));
        }
        let start = (0..=frame_idx)
            .rev()
            .find(|&i| self.index[i].frame_type == FrameType::Keyframe)
            .unwrap_or(0);

        let (cols, rows) = self.header.addressable();
        let mut screen = FrameBuffer::new();
        screen.grow_to_fit(0, self.header.rows as usize)?;
        for i in start..=frame_idx {
            let updates = self.read_frame(i)?;
            apply_within(&mut screen, &updates, cols, rows)?;
        }
        tracing::debug!(frame = frame_idx, keyframe = start, "replayed");
        Ok(screen)
    }

    pub fn frame_type(&self, frame_idx: usize) -> Result<FrameType> {
        self.index
            .get(frame_idx)
            .map(|e| e.frame_type)
            .ok_or(Error::FrameIndex(frame_idx))
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    pub fn fps(&self) -> u16 {
        self.header.fps
    }
}

/// Apply `updates`, growing only the rows they touch. Entries past the
/// stream's addressable `cols` x `rows` are rejected before anything grows.
fn apply_within(screen: &mut FrameBuffer, updates: &[UpdateEntry], cols: usize, rows: usize) -> Result<()> {
    if let Some(entry) = updates
        .iter()
        .find(|u| u.position.x as usize >= cols || u.position.y as usize >= rows)
    {
        return Err(Error::OutOfBounds {
            position: entry.position,
            width: cols,
            height: rows,
        });
    }
    for entry in updates {
        screen.grow_row(entry.position.y as usize, entry.position.x as usize + 1)?;
    }
    screen.apply(updates)
}
