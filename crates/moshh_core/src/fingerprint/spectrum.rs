//! Short-time Fourier transform magnitudes.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Magnitude spectrogram, frame-major: `frames[t][bin]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f64>>,
    /// Bins per frame (`window_size / 2`).
    pub num_bins: usize,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

/// Hann-windowed STFT with a fixed window and hop.
pub struct Stft {
    window: Vec<f64>,
    hop_size: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl Stft {
    pub fn new(window_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            window: hann_window(window_size),
            hop_size: hop_size.max(1),
            fft: planner.plan_fft_forward(window_size),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Frames are only produced while a full window of samples remains.
    pub fn magnitudes(&self, samples: &[i16]) -> Spectrogram {
        let window_size = self.window_size();
        let num_bins = window_size / 2;
        if window_size == 0 || samples.len() < window_size {
            return Spectrogram {
                frames: Vec::new(),
                num_bins,
            };
        }

        let num_frames = (samples.len() - window_size) / self.hop_size + 1;
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); window_size];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            for ((slot, &s), &w) in buffer
                .iter_mut()
                .zip(&samples[start..start + window_size])
                .zip(&self.window)
            {
                *slot = Complex::new(s as f64 * w, 0.0);
            }

            self.fft.process(&mut buffer);
            frames.push(buffer[..num_bins].iter().map(|c| c.norm()).collect());
        }

        Spectrogram { frames, num_bins }
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq_bin: usize, window: usize, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * freq_bin as f64 * i as f64 / window as f64;
                (phase.sin() * 10_000.0) as i16
            })
            .collect()
    }

    #[test]
    fn frame_count_requires_full_windows() {
        let stft = Stft::new(256, 256);
        assert_eq!(stft.magnitudes(&vec![0; 255]).num_frames(), 0);
        assert_eq!(stft.magnitudes(&vec![0; 256]).num_frames(), 1);
        assert_eq!(stft.magnitudes(&vec![0; 767]).num_frames(), 2);

        let overlapping = Stft::new(256, 128);
        assert_eq!(overlapping.magnitudes(&vec![0; 512]).num_frames(), 3);
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let stft = Stft::new(256, 256);
        let spec = stft.magnitudes(&tone(20, 256, 1024));

        assert_eq!(spec.num_bins, 128);
        for frame in &spec.frames {
            let peak = frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(peak, 20);
        }
    }

    #[test]
    fn silence_has_zero_magnitude() {
        let spec = Stft::new(128, 128).magnitudes(&vec![0; 512]);
        assert!(spec.frames.iter().flatten().all(|&m| m == 0.0));
    }
}
