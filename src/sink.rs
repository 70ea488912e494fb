use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{buffer::PixelBuffer, foundation::error::ChanResult};

/// Consumer of rendered frames (the display, a recorder, a test harness).
///
/// Ordering contract: frames arrive in presentation order; the last frame of every
/// transition is the exact target buffer.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &PixelBuffer) -> ChanResult<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn push_frame(&mut self, frame: &PixelBuffer) -> ChanResult<()> {
        (**self).push_frame(frame)
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    frames: Vec<PixelBuffer>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured frames in presentation order.
    pub fn frames(&self) -> &[PixelBuffer] {
        &self.frames
    }

    pub fn last(&self) -> Option<&PixelBuffer> {
        self.frames.last()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl FrameSink for InMemorySink {
    fn push_frame(&mut self, frame: &PixelBuffer) -> ChanResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Keeps only the most recent frame and a count.
#[derive(Debug, Default)]
pub struct LatestFrameSink {
    latest: Option<PixelBuffer>,
    count: u64,
}

impl LatestFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&PixelBuffer> {
        self.latest.as_ref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl FrameSink for LatestFrameSink {
    fn push_frame(&mut self, frame: &PixelBuffer) -> ChanResult<()> {
        match &mut self.latest {
            Some(prev) => prev.clone_from(frame),
            None => self.latest = Some(frame.clone()),
        }
        self.count += 1;
        Ok(())
    }
}

/// Writes each frame as `frame_000000.png`, `frame_000001.png`, ... under `dir`.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    next: u64,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> ChanResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create frame directory '{}'", dir.display()))?;
        Ok(Self { dir, next: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.next
    }
}

impl FrameSink for PngSequenceSink {
    fn push_frame(&mut self, frame: &PixelBuffer) -> ChanResult<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.next));
        frame
            .to_rgb_image()
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write frame '{}'", path.display()))?;
        self.next += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_sink_keeps_last_frame() {
        let mut sink = LatestFrameSink::new();
        sink.push_frame(&PixelBuffer::filled(1, 1, [1, 1, 1])).unwrap();
        sink.push_frame(&PixelBuffer::filled(1, 1, [2, 2, 2])).unwrap();
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.latest().unwrap().plane(0), &[2]);
    }

    #[test]
    fn png_sequence_numbers_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSequenceSink::new(dir.path().join("frames")).unwrap();
        let frame = PixelBuffer::filled(2, 2, [10, 20, 30]);
        sink.push_frame(&frame).unwrap();
        sink.push_frame(&frame).unwrap();
        assert_eq!(sink.written(), 2);
        let decoded = image::open(sink.dir().join("frame_000001.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(PixelBuffer::from_rgb_image(&decoded), frame);
    }
}
