use crate::buffer::FrameBuffer;
use crate::diff::{diff, DiffOptions, Viewport};
use crate::format::{FrameType, UpdateEntry};
use crate::Result;

/// Keyframe policy for [`DiffPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Frames between forced keyframes. 0 forces only the first one.
    pub keyframe_interval: u32,
    /// A delta touching more than this share of the scanned cells is sent as a keyframe instead.
    pub keyframe_threshold_percent: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: 30,
            keyframe_threshold_percent: 60,
        }
    }
}

/// Result of pushing one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameDiff {
    /// Full redraw: the receiver clears its screen, then draws these.
    Keyframe(Vec<UpdateEntry>),
    /// Only the changed cells.
    Delta(Vec<UpdateEntry>),
}

impl FrameDiff {
    pub fn updates(&self) -> &[UpdateEntry] {
        match self {
            FrameDiff::Keyframe(u) | FrameDiff::Delta(u) => u,
        }
    }

    pub fn into_updates(self) -> Vec<UpdateEntry> {
        match self {
            FrameDiff::Keyframe(u) | FrameDiff::Delta(u) => u,
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            FrameDiff::Keyframe(_) => FrameType::Keyframe,
            FrameDiff::Delta(_) => FrameType::Delta,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineStep {
    pub diff: FrameDiff,
    /// The viewport differs from the one the previous frame was diffed under.
    pub resized: bool,
}

/// Turns a sequence of frames into keyframes and deltas.
///
/// Keeps the last frame and the viewport it was shown in. A viewport change
/// forces a full redraw, since whatever the terminal showed before is no
/// longer laid out the way the previous frame assumed.
pub struct DiffPipeline {
    config: PipelineConfig,
    options: DiffOptions,
    previous: Option<FrameBuffer>,
    frame_index: u64,
}

impl DiffPipeline {
    /// Fails if `options` carries an invalid color tolerance.
    pub fn new(config: PipelineConfig, options: DiffOptions) -> Result<Self> {
        options.tolerance_squared()?;
        Ok(Self {
            config,
            options,
            previous: None,
            frame_index: 0,
        })
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frame_index
    }

    /// Diff `current` against the last pushed frame under `viewport`.
    pub fn push(&mut self, current: FrameBuffer, viewport: Viewport) -> Result<PipelineStep> {
        let resized = self.previous.is_some() && viewport != self.options.viewport;
        if resized {
            tracing::debug!(
                from = ?self.options.viewport,
                to = ?viewport,
                "viewport changed, forcing full redraw"
            );
        }
        self.options = self.options.with_viewport(viewport);

        let interval = u64::from(self.config.keyframe_interval);
        let forced = self.previous.is_none()
            || resized
            || (interval > 0 && self.frame_index % interval == 0);

        let diff = match self.previous.as_ref() {
            Some(prev) if !forced => {
                let updates = diff(prev, &current, &self.options)?;
                let total = self.scanned_cells(prev, &current);
                let threshold = usize::from(self.config.keyframe_threshold_percent);
                if updates.len() > total * threshold / 100 {
                    tracing::debug!(
                        frame = self.frame_index,
                        changed = updates.len(),
                        total,
                        "delta too large, promoting to keyframe"
                    );
                    FrameDiff::Keyframe(self.full_redraw(&current)?)
                } else {
                    FrameDiff::Delta(updates)
                }
            }
            _ => FrameDiff::Keyframe(self.full_redraw(&current)?),
        };

        tracing::trace!(
            frame = self.frame_index,
            kind = ?diff.frame_type(),
            updates = diff.updates().len(),
            "frame pushed"
        );

        self.previous = Some(current);
        self.frame_index += 1;
        Ok(PipelineStep { diff, resized })
    }

    /// Every visible present cell of `current`: a diff against nothing.
    fn full_redraw(&self, current: &FrameBuffer) -> Result<Vec<UpdateEntry>> {
        diff(&FrameBuffer::new(), current, &self.options)
    }

    fn scanned_cells(&self, prev: &FrameBuffer, current: &FrameBuffer) -> usize {
        if self.options.include_out_of_bounds {
            let width = prev.width().max(current.width());
            let height = prev.height().max(current.height());
            width * height
        } else {
            self.options.viewport.area()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Cell, Color, Position};

    fn frame(text: &[&str]) -> FrameBuffer {
        let mut buffer = FrameBuffer::new();
        for (y, line) in text.iter().enumerate() {
            buffer.write(&Cell::run(line, Color::WHITE, Position::new(0, y as u16)));
        }
        buffer
    }

    fn pipeline(interval: u32) -> DiffPipeline {
        let config = PipelineConfig {
            keyframe_interval: interval,
            keyframe_threshold_percent: 60,
        };
        DiffPipeline::new(config, DiffOptions::new(4, 2)).unwrap()
    }

    #[test]
    fn first_frame_is_keyframe_then_deltas() {
        let mut p = pipeline(0);
        let viewport = Viewport::new(4, 2);

        let step = p.push(frame(&["abcd", "efgh"]), viewport).unwrap();
        assert_eq!(step.diff.frame_type(), FrameType::Keyframe);
        assert_eq!(step.diff.updates().len(), 8);
        assert!(!step.resized);

        let step = p.push(frame(&["abXd", "efgh"]), viewport).unwrap();
        assert_eq!(step.diff.frame_type(), FrameType::Delta);
        let updates = step.diff.into_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].position, Position::new(2, 0));
        assert_eq!(updates[0].cell.glyph, 'X');
        assert_eq!(p.frames_pushed(), 2);
    }

    #[test]
    fn interval_forces_keyframes() {
        let mut p = pipeline(2);
        let viewport = Viewport::new(4, 2);
        let kinds: Vec<_> = (0..5)
            .map(|_| p.push(frame(&["abcd"]), viewport).unwrap().diff.frame_type())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FrameType::Keyframe,
                FrameType::Delta,
                FrameType::Keyframe,
                FrameType::Delta,
                FrameType::Keyframe,
            ]
        );
    }

    #[test]
    fn large_delta_is_promoted() {
        let mut p = pipeline(0);
        let viewport = Viewport::new(4, 2);
        p.push(frame(&["abcd", "efgh"]), viewport).unwrap();
        // 5 of 8 cells change: 5 > 8 * 60 / 100
        let step = p.push(frame(&["ABCD", "Efgh"]), viewport).unwrap();
        assert_eq!(step.diff.frame_type(), FrameType::Keyframe);
        assert_eq!(step.diff.updates().len(), 8);
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut p = pipeline(0);
        p.push(frame(&["abcd", "efgh"]), Viewport::new(4, 2)).unwrap();
        let step = p.push(frame(&["abcd", "efgh"]), Viewport::new(2, 2)).unwrap();
        assert!(step.resized);
        assert_eq!(step.diff.frame_type(), FrameType::Keyframe);
        // clipped to the new viewport
        assert_eq!(step.diff.updates().len(), 4);
        assert_eq!(p.options().viewport, Viewport::new(2, 2));
    }

    #[test]
    fn rejects_invalid_tolerance() {
        let options = DiffOptions::new(4, 2).with_color_tolerance(-1.0);
        assert!(DiffPipeline::new(PipelineConfig::default(), options).is_err());
    }
}
