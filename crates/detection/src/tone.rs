//! Voicemail beep-tone detection
//!
//! A voicemail greeting ends with a short single-frequency tone (commonly
//! ~900Hz) before recording starts. Detecting it is the strongest single
//! answering-machine signal, so it gets override priority in the decision
//! window.

use realfft::RealFftPlanner;

use dialer_config::DetectionSettings;
use dialer_core::AudioFrame;

use crate::DetectionError;

/// Spectral beep detector.
///
/// Stateless and side-effect free; safe to call concurrently across calls.
/// Never errors outward: any malformed input or internal FFT failure logs
/// and reads as "no beep" to keep the pipeline fail-open.
pub struct ToneDetector {
    target_hz: f32,
    tolerance_hz: f32,
    amplitude_threshold: f32,
}

impl ToneDetector {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            target_hz: settings.tone_target_hz,
            tolerance_hz: settings.tone_tolerance_hz,
            amplitude_threshold: settings.tone_amplitude_threshold,
        }
    }

    /// Check one audio frame for the characteristic beep tone.
    ///
    /// Returns true only if the peak-magnitude frequency bin lies within
    /// `tolerance_hz` of `target_hz` AND the normalized peak amplitude
    /// exceeds `amplitude_threshold`.
    pub fn detect_beep(&self, frame: &AudioFrame) -> bool {
        match self.analyze(frame) {
            Ok(detected) => detected,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    sequence = frame.sequence,
                    samples = frame.samples.len(),
                    "Tone analysis failed, treating as no beep"
                );
                false
            },
        }
    }

    fn analyze(&self, frame: &AudioFrame) -> Result<bool, DetectionError> {
        let n = frame.samples.len();

        // Too short for a meaningful spectrum; not an error, just no beep
        if n < 32 {
            tracing::debug!(samples = n, "Frame too short for tone analysis");
            return Ok(false);
        }

        if frame.samples.iter().any(|s| !s.is_finite()) {
            return Err(DetectionError::MalformedFrame(
                "non-finite sample values".into(),
            ));
        }

        // Periodic Hann window; coherent gain is window_sum / n
        let mut window_sum = 0.0f32;
        let mut windowed: Vec<f32> = frame
            .samples
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
                let w = 0.5 * (1.0 - x.cos());
                window_sum += w;
                s * w
            })
            .collect();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let mut spectrum = fft.make_output_vec();
        fft.process(&mut windowed, &mut spectrum)
            .map_err(|e| DetectionError::Fft(e.to_string()))?;

        // Peak bin, skipping DC
        let (peak_bin, peak_mag) = spectrum
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| (i, c.norm()))
            .fold((0usize, 0.0f32), |acc, (i, mag)| {
                if mag > acc.1 {
                    (i, mag)
                } else {
                    acc
                }
            });

        if peak_bin == 0 || window_sum <= 0.0 {
            return Ok(false);
        }

        let bin_width = frame.sample_rate.as_u32() as f32 / n as f32;
        let peak_hz = peak_bin as f32 * bin_width;

        // Normalize so a full-scale sine at the peak frequency reads ~1.0.
        // For a windowed sine, peak magnitude is amplitude * window_sum / 2.
        let normalized = 2.0 * peak_mag / window_sum;

        let in_band = (peak_hz - self.target_hz).abs() <= self.tolerance_hz;
        let loud_enough = normalized > self.amplitude_threshold;

        tracing::debug!(
            peak_hz = format!("{:.1}", peak_hz),
            normalized = format!("{:.3}", normalized),
            in_band = in_band,
            "Tone analysis"
        );

        Ok(in_band && loud_enough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_core::SampleRate;
    use rand::Rng;

    fn detector() -> ToneDetector {
        ToneDetector::new(&DetectionSettings::default())
    }

    /// 500ms sine at the given frequency and amplitude, 8kHz
    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        let rate = 8000.0f32;
        (0..4000)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn test_pure_beep_detected() {
        let frame = AudioFrame::new(sine(900.0, 0.8), SampleRate::Hz8000, 0);
        assert!(detector().detect_beep(&frame));
    }

    #[test]
    fn test_beep_with_noise_detected() {
        let mut rng = rand::thread_rng();
        let samples: Vec<f32> = sine(900.0, 0.8)
            .into_iter()
            .map(|s| s + rng.gen_range(-0.2..0.2))
            .collect();
        let frame = AudioFrame::new(samples, SampleRate::Hz8000, 0);
        assert!(detector().detect_beep(&frame));
    }

    #[test]
    fn test_pure_noise_rejected() {
        let mut rng = rand::thread_rng();
        let samples: Vec<f32> = (0..4000).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let frame = AudioFrame::new(samples, SampleRate::Hz8000, 0);
        assert!(!detector().detect_beep(&frame));
    }

    #[test]
    fn test_off_frequency_tone_rejected() {
        // 2kHz is well outside the 900 +/- 100Hz band
        let frame = AudioFrame::new(sine(2000.0, 0.8), SampleRate::Hz8000, 0);
        assert!(!detector().detect_beep(&frame));
    }

    #[test]
    fn test_quiet_tone_rejected() {
        // In-band but below the 0.3 amplitude threshold
        let frame = AudioFrame::new(sine(900.0, 0.1), SampleRate::Hz8000, 0);
        assert!(!detector().detect_beep(&frame));
    }

    #[test]
    fn test_empty_frame_is_no_beep() {
        let frame = AudioFrame::new(Vec::new(), SampleRate::Hz8000, 0);
        assert!(!detector().detect_beep(&frame));
    }

    #[test]
    fn test_malformed_frame_is_no_beep() {
        let mut samples = sine(900.0, 0.8);
        samples[100] = f32::NAN;
        let frame = AudioFrame::new(samples, SampleRate::Hz8000, 0);
        assert!(!detector().detect_beep(&frame));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let frame = AudioFrame::new(sine(900.0, 0.8), SampleRate::Hz8000, 0);
        let det = detector();
        assert_eq!(det.detect_beep(&frame), det.detect_beep(&frame));
    }
}
