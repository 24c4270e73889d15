use std::io::{Seek, SeekFrom, Write};

use crate::codec::encode_updates;
use crate::compress;
use crate::format::*;
use crate::pipeline::FrameDiff;
use crate::Result;

/// Writes update streams incrementally.
pub struct StreamWriter<W: Write + Seek> {
    writer: W,
    header: StreamHeader,
    index: Vec<FrameIndexEntry>,
}

impl<W: Write + Seek> StreamWriter<W> {
    /// Create a new writer. Writes a placeholder header immediately.
    pub fn new(mut writer: W, cols: u16, rows: u16, fps: u16) -> Result<Self> {
        let header = StreamHeader {
            cols,
            rows,
            fps,
            frame_count: 0,
            index_offset: 0,
            extent_cols: cols as u32,
            extent_rows: rows as u32,
        };
        writer.write_all(&header.to_bytes())?;
        Ok(Self {
            writer,
            header,
            index: Vec::new(),
        })
    }

    /// Write one frame: its updates, run-length encoded then compressed.
    pub fn write_frame(&mut self, frame_type: FrameType, updates: &[UpdateEntry]) -> Result<()> {
        for entry in updates {
            self.header.extent_cols = self.header.extent_cols.max(entry.position.x as u32 + 1);
            self.header.extent_rows = self.header.extent_rows.max(entry.position.y as u32 + 1);
        }
        let compressed = compress::compress(&encode_updates(updates));
        let offset = self.writer.stream_position()?;
        self.writer.write_all(&compressed)?;

        self.index.push(FrameIndexEntry {
            offset,
            compressed_size: compressed.len() as u32,
            frame_type,
        });
        tracing::trace!(
            frame = self.index.len() - 1,
            updates = updates.len(),
            bytes = compressed.len(),
            "frame written"
        );
        Ok(())
    }

    pub fn write_diff(&mut self, diff: &FrameDiff) -> Result<()> {
        self.write_frame(diff.frame_type(), diff.updates())
    }

    pub fn frames_written(&self) -> usize {
        self.index.len()
    }

    /// Finalize: write frame index, update header, flush.
    pub fn finish(mut self) -> Result<W> {
        let index_offset = self.writer.stream_position()?;
        for entry in &self.index {
            self.writer.write_all(&entry.to_bytes())?;
        }

        self.header.frame_count = self.index.len() as u32;
        self.header.index_offset = index_offset;

        // Seek back and rewrite header
        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&self.header.to_bytes())?;

        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;

        tracing::debug!(
            frames = self.header.frame_count,
            extent_cols = self.header.extent_cols,
            extent_rows = self.header.extent_rows,
            "stream finished"
        );
        Ok(self.writer)
    }
}
