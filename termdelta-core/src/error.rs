//! Error types for termdelta-core.

use std::io;

use thiserror::Error;

use crate::format::Position;

/// Errors raised by the differ, frame buffers, and the update-stream codec.
///
/// Shape irregularities in frame buffers (jagged rows, empty buffers,
/// mismatched sizes) are never errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Color tolerance was negative or not a number.
    #[error("invalid color tolerance: {0} (must be a number >= 0)")]
    InvalidTolerance(f32),

    /// An update entry lies outside the buffer it is applied to.
    #[error("position ({}, {}) is out of bounds for {width}x{height} frame buffer", .position.x, .position.y)]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },

    /// A frame buffer extent does not fit in u16 coordinates.
    #[error("frame buffer extent {0} exceeds the addressable {max} cells", max = u16::MAX as usize + 1)]
    TooLarge(usize),

    /// Stream does not start with the expected magic bytes.
    #[error("invalid magic: expected TDLT")]
    InvalidMagic,

    #[error("unsupported stream version: {0}")]
    UnsupportedVersion(u16),

    /// Frame payload ended in the middle of a command.
    #[error("truncated frame payload")]
    Truncated,

    /// Glyph bytes in a frame payload are not a single UTF-8 character.
    #[error("invalid glyph encoding")]
    InvalidGlyph,

    /// Frame payload is well-formed bytes but not a valid command sequence.
    #[error("malformed frame payload: {0}")]
    Malformed(&'static str),

    #[error("frame index {0} out of range")]
    FrameIndex(usize),

    #[error("lz4 decompress failed: {0}")]
    Decompress(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for termdelta-core operations.
pub type Result<T> = std::result::Result<T, Error>;
