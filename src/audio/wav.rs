//! WAV decoding and encoding.

use super::PcmBuffer;
use crate::error::{RedubError, Result};
use std::io::{Read, Seek, Write};
use std::path::Path;

/// On-disk sample encoding of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    /// Signed integer PCM with the given bit depth (8, 16, 24 or 32).
    Int(u16),
    /// 32-bit IEEE float.
    Float32,
}

impl WavEncoding {
    pub const PCM16: WavEncoding = WavEncoding::Int(16);

    fn from_spec(spec: &hound::WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => Ok(WavEncoding::Int(bits)),
            (hound::SampleFormat::Float, 32) => Ok(WavEncoding::Float32),
            (format, bits) => Err(RedubError::InvalidInput(format!(
                "unsupported WAV sample format: {:?} {}-bit",
                format, bits
            ))),
        }
    }

    fn to_spec(self, channels: u16, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavEncoding::Int(bits) => (bits, hound::SampleFormat::Int),
            WavEncoding::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Header-level facts about a WAV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
    pub encoding: WavEncoding,
}

impl WavInfo {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Read a WAV header without decoding samples.
pub fn probe_wav(path: &Path) -> Result<WavInfo> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration(),
        encoding: WavEncoding::from_spec(&spec)?,
    })
}

/// Decode a WAV file into normalized `f32` samples.
pub fn read_wav(path: &Path) -> Result<(PcmBuffer, WavEncoding)> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

/// Decode WAV data from any reader.
pub fn read_wav_from<R: Read>(reader: R) -> Result<(PcmBuffer, WavEncoding)> {
    decode(hound::WavReader::new(reader)?)
}

fn decode<R: Read>(mut reader: hound::WavReader<R>) -> Result<(PcmBuffer, WavEncoding)> {
    let spec = reader.spec();
    let encoding = WavEncoding::from_spec(&spec)?;

    if spec.channels == 0 {
        return Err(RedubError::InvalidInput("WAV file declares zero channels".into()));
    }

    let samples: Vec<f32> = match encoding {
        WavEncoding::Float32 => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        WavEncoding::Int(bits) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((PcmBuffer::new(samples, spec.channels, spec.sample_rate), encoding))
}

/// Encode samples to a WAV file.
pub fn write_wav(path: &Path, buffer: &PcmBuffer, encoding: WavEncoding) -> Result<()> {
    let spec = encoding.to_spec(buffer.channels, buffer.sample_rate);
    let writer = hound::WavWriter::create(path, spec)?;
    encode(writer, buffer, encoding)
}

/// Encode samples as WAV into any seekable writer.
pub fn write_wav_to<W: Write + Seek>(
    out: W,
    buffer: &PcmBuffer,
    encoding: WavEncoding,
) -> Result<()> {
    let spec = encoding.to_spec(buffer.channels, buffer.sample_rate);
    encode(hound::WavWriter::new(out, spec)?, buffer, encoding)
}

fn encode<W: Write + Seek>(
    mut writer: hound::WavWriter<W>,
    buffer: &PcmBuffer,
    encoding: WavEncoding,
) -> Result<()> {
    match encoding {
        WavEncoding::Float32 => {
            for &s in &buffer.samples {
                writer.write_sample(s)?;
            }
        }
        WavEncoding::Int(8) => {
            for &s in &buffer.samples {
                writer.write_sample(quantize(s, 8) as i8)?;
            }
        }
        WavEncoding::Int(16) => {
            for &s in &buffer.samples {
                writer.write_sample(quantize(s, 16) as i16)?;
            }
        }
        WavEncoding::Int(bits) => {
            for &s in &buffer.samples {
                writer.write_sample(quantize(s, bits))?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Map a normalized sample to a signed integer of `bits` width, clamping.
fn quantize(sample: f32, bits: u16) -> i32 {
    let max = ((1i64 << (bits - 1)) - 1) as f64;
    let min = -(1i64 << (bits - 1)) as f64;
    (sample as f64 * (max + 1.0)).round().clamp(min, max) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pcm16_round_trip_is_exact() {
        let original: Vec<i16> = vec![0, 1, -1, 1000, -1000, i16::MAX, i16::MIN];
        let buffer = PcmBuffer::new(
            original.iter().map(|&s| s as f32 / 32768.0).collect(),
            1,
            16_000,
        );

        let mut cursor = Cursor::new(Vec::new());
        write_wav_to(&mut cursor, &buffer, WavEncoding::PCM16).unwrap();
        cursor.set_position(0);

        let mut reader = hound::WavReader::new(cursor).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_quantize_clamps_out_of_range() {
        assert_eq!(quantize(2.0, 16), i16::MAX as i32);
        assert_eq!(quantize(-2.0, 16), i16::MIN as i32);
        assert_eq!(quantize(0.0, 24), 0);
    }

    #[test]
    fn test_probe_wav_reports_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = PcmBuffer::new(vec![0.0; 2 * 22_050], 2, 44_100);
        write_wav(&path, &buffer, WavEncoding::PCM16).unwrap();

        let info = probe_wav(&path).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.frames, 22_050);
        assert!((info.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_float_wav_is_decoded() {
        let buffer = PcmBuffer::new(vec![0.25, -0.5], 1, 8_000);
        let mut cursor = Cursor::new(Vec::new());
        write_wav_to(&mut cursor, &buffer, WavEncoding::Float32).unwrap();
        cursor.set_position(0);

        let (decoded, encoding) = read_wav_from(cursor).unwrap();
        assert_eq!(encoding, WavEncoding::Float32);
        assert_eq!(decoded.samples, vec![0.25, -0.5]);
    }
}
