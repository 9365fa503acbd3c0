use crate::audio::{AudioLoader, AudioSignal};
use eyre::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Read a WAV file into mono f32 samples.
///
/// Integer formats are scaled to `[-1.0, 1.0)`; multi-channel audio is
/// downmixed by averaging each frame.
pub fn read_wav<P: AsRef<Path>>(file_path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(file_path.as_ref())
        .with_context(|| format!("failed to open {}", file_path.as_ref().display()))?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((samples, sample_rate))
}

/// Write mono f32 samples as 16-bit PCM.
pub fn write_wav<P: AsRef<Path>>(file_path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(file_path.as_ref(), spec)
        .with_context(|| format!("failed to create {}", file_path.as_ref().display()))?;
    for &s in samples {
        writer.write_sample((s * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// [`AudioLoader`] for WAV files.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavLoader;

impl AudioLoader for WavLoader {
    fn load(&self, path: &Path) -> Result<AudioSignal> {
        let (samples, sample_rate) = read_wav(path)?;
        let signal = AudioSignal::new(samples, sample_rate)
            .with_context(|| format!("invalid audio in {}", path.display()))?;
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiarizationError;

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..1600).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        write_wav(&path, &samples, 16000).unwrap();

        let signal = WavLoader.load(&path).unwrap();
        assert_eq!(signal.sample_rate(), 16000);
        assert_eq!(signal.len(), 1600);
        assert!((signal.samples()[0] - 0.5).abs() < 1e-3);
        assert!((signal.samples()[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = read_wav(&path).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(samples.len(), 10);
        assert!((samples[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, &[], 16000).unwrap();

        let err = WavLoader.load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DiarizationError>(),
            Some(DiarizationError::EmptySignal)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_wav("/nonexistent/audio.wav").is_err());
    }
}
