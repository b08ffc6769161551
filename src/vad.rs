//! Energy-based utterance segmentation.
//!
//! Audio is consumed in fixed 30 ms frames. The first frames calibrate the
//! ambient noise floor; after that the segmenter waits for a frame louder than
//! the threshold, records until a long enough pause (or the phrase limit), and
//! gives up if nobody starts speaking within the listen timeout.

use std::collections::VecDeque;
use std::time::Duration;

const FRAME_MS: u64 = 30;
/// Frames kept from before speech onset so the first syllable is not clipped.
const PRE_ROLL_FRAMES: usize = 10;
/// Speech must be this much louder than the measured ambient level.
const AMBIENT_RATIO: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Calibrating,
    Waiting,
    Speaking,
    Done,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct VadConfig {
    pub sample_rate: u32,
    pub calibration: Duration,
    pub listen_timeout: Duration,
    pub pause_threshold: Duration,
    pub phrase_time_limit: Duration,
    pub min_threshold: f32,
}

pub struct VoiceActivity {
    state: VadState,
    frame_len: usize,
    calibration_frames: usize,
    timeout_frames: usize,
    pause_frames: usize,
    max_frames: usize,
    min_threshold: f32,
    threshold: f32,

    pending: Vec<f32>,
    ambient_energy: f64,
    calibrated_frames: usize,
    waited_frames: usize,
    silent_frames: usize,
    spoken_frames: usize,
    pre_roll: VecDeque<Vec<f32>>,
    recorded: Vec<f32>,
}

fn frames_in(duration: Duration) -> usize {
    (duration.as_millis() as u64).div_ceil(FRAME_MS) as usize
}

pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / frame.len() as f64).sqrt() as f32
}

impl VoiceActivity {
    pub fn new(config: &VadConfig) -> Self {
        let calibration_frames = frames_in(config.calibration);
        Self {
            state: if calibration_frames == 0 {
                VadState::Waiting
            } else {
                VadState::Calibrating
            },
            frame_len: ((config.sample_rate as u64 * FRAME_MS / 1000) as usize).max(1),
            calibration_frames,
            timeout_frames: frames_in(config.listen_timeout).max(1),
            pause_frames: frames_in(config.pause_threshold).max(1),
            max_frames: frames_in(config.phrase_time_limit).max(1),
            min_threshold: config.min_threshold,
            threshold: config.min_threshold,
            pending: Vec::new(),
            ambient_energy: 0.0,
            calibrated_frames: 0,
            waited_frames: 0,
            silent_frames: 0,
            spoken_frames: 0,
            pre_roll: VecDeque::with_capacity(PRE_ROLL_FRAMES),
            recorded: Vec::new(),
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, VadState::Done | VadState::TimedOut)
    }

    /// Feeds mono samples; returns the state after consuming every complete frame.
    pub fn push(&mut self, samples: &[f32]) -> VadState {
        self.pending.extend_from_slice(samples);
        let mut offset = 0;
        while !self.is_finished() && self.pending.len() - offset >= self.frame_len {
            let frame = self.pending[offset..offset + self.frame_len].to_vec();
            offset += self.frame_len;
            self.process_frame(frame);
        }
        self.pending.drain(..offset);
        self.state
    }

    fn process_frame(&mut self, frame: Vec<f32>) {
        let energy = rms(&frame);
        match self.state {
            VadState::Calibrating => {
                self.ambient_energy += energy as f64;
                self.calibrated_frames += 1;
                if self.calibrated_frames >= self.calibration_frames {
                    let ambient = (self.ambient_energy / self.calibrated_frames as f64) as f32;
                    self.threshold = (ambient * AMBIENT_RATIO).max(self.min_threshold);
                    tracing::debug!(ambient, threshold = self.threshold, "ambient noise calibrated");
                    self.state = VadState::Waiting;
                }
            }
            VadState::Waiting => {
                if energy > self.threshold {
                    for earlier in self.pre_roll.drain(..) {
                        self.recorded.extend_from_slice(&earlier);
                    }
                    self.recorded.extend_from_slice(&frame);
                    self.spoken_frames = 1;
                    self.state = VadState::Speaking;
                    return;
                }
                self.waited_frames += 1;
                if self.waited_frames >= self.timeout_frames {
                    self.state = VadState::TimedOut;
                    return;
                }
                if self.pre_roll.len() == PRE_ROLL_FRAMES {
                    self.pre_roll.pop_front();
                }
                self.pre_roll.push_back(frame);
            }
            VadState::Speaking => {
                self.recorded.extend_from_slice(&frame);
                self.spoken_frames += 1;
                if energy > self.threshold {
                    self.silent_frames = 0;
                } else {
                    self.silent_frames += 1;
                }
                if self.silent_frames >= self.pause_frames || self.spoken_frames >= self.max_frames {
                    self.state = VadState::Done;
                }
            }
            VadState::Done | VadState::TimedOut => {}
        }
    }

    /// The recorded phrase, pre-roll included. Empty unless speech was detected.
    pub fn take_recording(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.recorded)
    }
}
