/// One fixed-size block of mono samples, as delivered to the analysis thread.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Re-chunks arbitrarily sized buffers (cpal callbacks, WAV reads) into
/// frames of exactly `frame_size` samples.
#[derive(Debug)]
pub struct FrameAssembler {
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Append samples and hand every completed frame to `emit`.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            emit(std::mem::replace(&mut self.pending, rest));
        }
    }

    /// The trailing partial frame, if any.
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Take the first channel of interleaved audio.
pub fn downmix_first_channel(data: &[f32], channels: usize) -> Vec<f32> {
    if channels > 1 {
        data.iter().step_by(channels).copied().collect()
    } else {
        data.to_vec()
    }
}
