//! Frame-diff engine for terminal-rendered video.
//!
//! [`diff`] compares two [`FrameBuffer`]s and yields the cell updates needed
//! to turn the previous frame into the current one. [`DiffPipeline`] runs it
//! over a sequence of frames, and [`StreamWriter`] / [`StreamReader`] store
//! the resulting update lists.

pub mod buffer;
pub mod codec;
pub mod compress;
pub mod decode;
pub mod diff;
pub mod encode;
pub mod error;
pub mod format;
pub mod pipeline;

pub use buffer::FrameBuffer;
pub use decode::StreamReader;
pub use diff::{diff, diff_with, DiffOptions, Viewport, DEFAULT_COLOR_TOLERANCE};
pub use encode::StreamWriter;
pub use error::{Error, Result};
pub use format::{Cell, Color, FrameType, Position, UpdateEntry};
pub use pipeline::{DiffPipeline, FrameDiff, PipelineConfig, PipelineStep};
