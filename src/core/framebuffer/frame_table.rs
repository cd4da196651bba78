use super::frame_buffer::*;
use super::region::*;

/// Frame buffers in arrival order, unique by frame number.
#[derive(Debug, Default, Clone)]
pub struct FrameTable {
    entries: Vec<FrameBuffer>,
    current_frame: Option<f64>,
}

impl FrameTable {
    pub fn new() -> Self {
        FrameTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frames(&self) -> Vec<f64> {
        self.entries.iter().map(|fb| fb.frame()).collect()
    }

    /// Frame of the most recent `OpenImage`.
    pub fn current_frame(&self) -> Option<f64> {
        self.current_frame
    }

    pub fn index_of(&self, frame: f64) -> Option<usize> {
        self.entries.iter().position(|fb| fb.frame() == frame)
    }

    /// Index of the buffer that incoming buckets go to.
    pub fn current_index(&self) -> Option<usize> {
        self.current_frame.and_then(|f| self.index_of(f))
    }

    pub fn get(&self, index: usize) -> Option<&FrameBuffer> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut FrameBuffer> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameBuffer> {
        self.entries.iter()
    }

    /// Finds or creates the buffer for `frame` and makes it current.
    ///
    /// New entries start as a copy of the most recently added one (channels
    /// and pixels) so a new pass shows the previous image until overwritten.
    /// Without multi-frame, the table is replaced by that single entry.
    pub fn open_frame(&mut self, frame: f64, resolution: Resolution, multi_frame: bool) -> usize {
        self.current_frame = Some(frame);
        if multi_frame {
            if let Some(index) = self.index_of(frame) {
                return index;
            }
            let fb = self.seed(frame, resolution);
            self.entries.push(fb);
            return self.entries.len() - 1;
        }
        let fb = self.seed(frame, resolution);
        self.entries = vec![fb];
        return 0;
    }

    fn seed(&self, frame: f64, resolution: Resolution) -> FrameBuffer {
        match self.entries.last() {
            Some(last) => {
                let mut fb = last.clone();
                fb.set_frame(frame);
                fb
            }
            None => FrameBuffer::new(frame, resolution),
        }
    }

    /// Exact match, else the greatest frame not after `requested`, else the
    /// earliest frame held. Empty or single-entry tables resolve to 0.
    pub fn select(&self, requested: f64) -> usize {
        if self.entries.len() <= 1 {
            return 0;
        }
        let mut below: Option<(f64, usize)> = None;
        let mut earliest: Option<(f64, usize)> = None;
        for (i, fb) in self.entries.iter().enumerate() {
            let frame = fb.frame();
            if frame == requested {
                return i;
            }
            if frame < requested && below.map_or(true, |(f, _)| frame > f) {
                below = Some((frame, i));
            }
            if earliest.map_or(true, |(f, _)| frame < f) {
                earliest = Some((frame, i));
            }
        }
        return below.or(earliest).map(|(_, i)| i).unwrap_or(0);
    }

    /// Selection for a reader. Without multi-frame the current frame wins.
    pub fn resolve(&self, requested: f64, multi_frame: bool) -> Option<&FrameBuffer> {
        let requested = if multi_frame {
            requested
        } else {
            self.current_frame.unwrap_or(requested)
        };
        self.entries.get(self.select(requested))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_frame = None;
    }
}
