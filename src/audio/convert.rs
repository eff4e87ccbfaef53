//! Audio format conversion
//!
//! Everything the robot captures is normalized to 16-bit PCM WAV at the
//! rate and channel count the transcription capability expects.

use std::io::Cursor;

use crate::{Error, Result};

/// Sample rate expected by speech models (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Frames per resampler chunk
const RESAMPLE_CHUNK: usize = 1024;

/// Lowest source or target rate accepted
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest source or target rate accepted
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Most channels accepted in a source or target stream
pub const MAX_CHANNELS: u16 = 8;

/// Target encoding for transcription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
        }
    }
}

/// Encoding of captured audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Headerless little-endian signed 16-bit PCM
    Pcm16 { sample_rate: u32, channels: u16 },
    /// RIFF/WAVE container
    Wav,
    /// MPEG layer III
    Mp3,
}

impl SourceEncoding {
    /// Identify a self-describing container from its leading bytes
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if the bytes match no known container
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Ok(Self::Wav);
        }

        let is_id3 = data.starts_with(b"ID3");
        let is_mpeg_frame = data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0;
        if is_id3 || is_mpeg_frame {
            return Ok(Self::Mp3);
        }

        Err(Error::UnsupportedFormat(format!(
            "unrecognized audio container ({} bytes)",
            data.len()
        )))
    }
}

/// Raw sound captured from the robot
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub data: Vec<u8>,

    /// Declared encoding; `None` means detect from content
    pub encoding: Option<SourceEncoding>,
}

impl AudioBuffer {
    /// Buffer whose encoding is detected from its header
    #[must_use]
    pub const fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            encoding: None,
        }
    }

    /// Buffer with an explicitly declared encoding
    #[must_use]
    pub const fn with_encoding(data: Vec<u8>, encoding: SourceEncoding) -> Self {
        Self {
            data,
            encoding: Some(encoding),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decoded interleaved samples
struct Decoded {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Convert captured audio into WAV matching `target`
///
/// Decodes the source, mixes to the target channel count, resamples to the
/// target rate and re-encodes as 16-bit PCM WAV.
///
/// # Errors
///
/// Returns `UnsupportedFormat` if the source encoding is unrecognized,
/// the data does not decode as its declared encoding, or its rate or
/// channel count is out of range
pub fn convert_format(raw: &AudioBuffer, target: &AudioSpec) -> Result<Vec<u8>> {
    if check_stream(target.sample_rate, target.channels).is_err() {
        return Err(Error::Config(format!("invalid target audio spec: {target:?}")));
    }

    let encoding = match raw.encoding {
        Some(encoding) => encoding,
        None => SourceEncoding::detect(&raw.data)?,
    };

    let decoded = match encoding {
        SourceEncoding::Pcm16 {
            sample_rate,
            channels,
        } => decode_pcm16(&raw.data, sample_rate, channels)?,
        SourceEncoding::Wav => decode_wav_bytes(&raw.data)?,
        SourceEncoding::Mp3 => decode_mp3(&raw.data)?,
    };

    tracing::debug!(
        ?encoding,
        source_rate = decoded.sample_rate,
        source_channels = decoded.channels,
        target_rate = target.sample_rate,
        target_channels = target.channels,
        "converting audio"
    );

    let mut planes = deinterleave(&decoded.samples, decoded.channels);
    planes = remix(planes, target.channels);

    if decoded.sample_rate != target.sample_rate {
        planes = resample(&planes, decoded.sample_rate, target.sample_rate)?;
    }

    samples_to_wav(&interleave(&planes), target.sample_rate, target.channels)
}

/// Convert interleaved f32 samples to WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;

        for &sample in samples {
            // f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(sample_i16)?;
        }

        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Decode WAV bytes into interleaved f32 samples and the WAV spec
///
/// # Errors
///
/// Returns `UnsupportedFormat` if the data is not a readable WAV file
pub fn decode_wav(data: &[u8]) -> Result<(Vec<f32>, hound::WavSpec)> {
    let reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| Error::UnsupportedFormat(format!("invalid WAV data: {e}")))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| Error::UnsupportedFormat(format!("invalid WAV samples: {e}")))?;

    Ok((samples, spec))
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Whether WAV audio stays below `threshold` RMS energy
///
/// # Errors
///
/// Returns `UnsupportedFormat` if the data is not WAV
pub fn is_silent(wav: &[u8], threshold: f32) -> Result<bool> {
    let (samples, _) = decode_wav(wav)?;
    Ok(rms_energy(&samples) < threshold)
}

/// Reject stream parameters the resampler cannot handle sanely
fn check_stream(sample_rate: u32, channels: u16) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(Error::UnsupportedFormat(format!(
            "sample rate {sample_rate} Hz outside {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}"
        )));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(Error::UnsupportedFormat(format!(
            "{channels} channels outside 1..={MAX_CHANNELS}"
        )));
    }
    Ok(())
}

fn decode_wav_bytes(data: &[u8]) -> Result<Decoded> {
    let (samples, spec) = decode_wav(data)?;
    check_stream(spec.sample_rate, spec.channels)?;
    Ok(Decoded {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn decode_pcm16(data: &[u8], sample_rate: u32, channels: u16) -> Result<Decoded> {
    check_stream(sample_rate, channels)?;
    if data.len() % 2 != 0 {
        return Err(Error::UnsupportedFormat(
            "PCM16 data has an odd number of bytes".to_string(),
        ));
    }

    let samples = data
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect();

    Ok(Decoded {
        samples,
        sample_rate,
        channels,
    })
}

#[allow(clippy::cast_sign_loss)]
fn decode_mp3(data: &[u8]) -> Result<Decoded> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0_u32;
    let mut channels = 0_u16;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                #[allow(clippy::cast_possible_truncation)]
                {
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::UnsupportedFormat(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(Error::UnsupportedFormat("MP3 stream has no frames".to_string()));
    }
    check_stream(sample_rate, channels)?;

    Ok(Decoded {
        samples,
        sample_rate,
        channels,
    })
}

fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let channels = usize::from(channels.max(1));
    let mut planes = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

fn interleave(planes: &[Vec<f32>]) -> Vec<f32> {
    let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planes.len());
    for i in 0..frames {
        out.extend(planes.iter().map(|p| p[i]));
    }
    out
}

/// Mix planes down (average) or up (duplicate) to `channels`
#[allow(clippy::cast_precision_loss)]
fn remix(planes: Vec<Vec<f32>>, channels: u16) -> Vec<Vec<f32>> {
    let target = usize::from(channels);
    if planes.len() == target {
        return planes;
    }

    let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
    let count = planes.len() as f32;
    let mono: Vec<f32> = (0..frames)
        .map(|i| planes.iter().map(|p| p[i]).sum::<f32>() / count)
        .collect();

    vec![mono; target]
}

/// Resample each plane with rubato
#[allow(clippy::cast_possible_truncation)]
fn resample(planes: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Result<Vec<Vec<f32>>> {
    use rubato::{FftFixedIn, Resampler};

    let frames = planes.first().map_or(0, Vec::len);
    if frames == 0 {
        return Ok(planes.to_vec());
    }

    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        2,
        planes.len(),
    )
    .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    // Rubato may round the requested chunk size to fit the rate ratio
    let chunk_len = resampler.input_frames_next();
    let expected = (frames as u64 * u64::from(to_rate)).div_ceil(u64::from(from_rate)) as usize;
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(expected); planes.len()];

    let mut start = 0;
    while start < frames {
        let end = (start + chunk_len).min(frames);
        // Last chunk is zero-padded to the fixed input size
        let chunk: Vec<Vec<f64>> = planes
            .iter()
            .map(|p| {
                let mut c: Vec<f64> = p[start..end].iter().map(|&s| f64::from(s)).collect();
                c.resize(chunk_len, 0.0);
                c
            })
            .collect();

        let result = resampler
            .process(&chunk, None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        for (out, plane) in output.iter_mut().zip(result) {
            out.extend(plane);
        }
        start = end;
    }

    Ok(output
        .into_iter()
        .map(|mut p| {
            p.truncate(expected);
            p.into_iter().map(|s| s as f32).collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm16_tone(sample_rate: u32, secs: f32) -> Vec<u8> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .flat_map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / sample_rate as f32;
                #[allow(clippy::cast_possible_truncation)]
                let v = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16;
                v.to_le_bytes()
            })
            .collect()
    }

    #[test]
    fn test_raw_pcm_gets_wav_header() {
        let raw = AudioBuffer::with_encoding(
            pcm16_tone(16000, 0.1),
            SourceEncoding::Pcm16 {
                sample_rate: 16000,
                channels: 1,
            },
        );

        let wav = convert_format(&raw, &AudioSpec::default()).unwrap();

        assert!(wav.starts_with(b"RIFF"));
        assert_eq!(&wav[8..12], b"WAVE");
        let (samples, spec) = decode_wav(&wav).unwrap();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples.len(), 1600);
    }

    #[test]
    fn test_unknown_container_is_unsupported() {
        let raw = AudioBuffer::new(b"DUMMY_AUDIO_DATA".to_vec());
        let err = convert_format(&raw, &AudioSpec::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_odd_pcm_length_is_unsupported() {
        let raw = AudioBuffer::with_encoding(
            vec![0, 1, 2],
            SourceEncoding::Pcm16 {
                sample_rate: 16000,
                channels: 1,
            },
        );
        assert!(matches!(
            convert_format(&raw, &AudioSpec::default()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    /// 16-bit PCM WAV with an arbitrary header, built by hand so any rate fits
    #[allow(clippy::cast_possible_truncation)]
    fn wav_with_header(sample_rate: u32, channels: u16) -> Vec<u8> {
        let data = [0_u8; 4];
        let block_align = channels.wrapping_mul(2);
        let byte_rate = sample_rate.wrapping_mul(u32::from(block_align));

        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16_u32.to_le_bytes());
        wav.extend_from_slice(&1_u16.to_le_bytes());
        wav.extend_from_slice(&channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&16_u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data.len() as u32).to_le_bytes());
        wav.extend_from_slice(&data);
        wav
    }

    #[test]
    fn test_out_of_range_wav_rate_is_unsupported() {
        for rate in [2_147_483_647, 1, 7_999, 192_001] {
            let raw = AudioBuffer::new(wav_with_header(rate, 1));
            assert!(
                matches!(
                    convert_format(&raw, &AudioSpec::default()),
                    Err(Error::UnsupportedFormat(_))
                ),
                "rate {rate} was accepted"
            );
        }
    }

    #[test]
    fn test_too_many_channels_is_unsupported() {
        let raw = AudioBuffer::new(wav_with_header(16000, 64));
        assert!(matches!(
            convert_format(&raw, &AudioSpec::default()),
            Err(Error::UnsupportedFormat(_))
        ));

        let pcm = AudioBuffer::with_encoding(
            vec![0; 32],
            SourceEncoding::Pcm16 {
                sample_rate: 16000,
                channels: MAX_CHANNELS + 1,
            },
        );
        assert!(matches!(
            convert_format(&pcm, &AudioSpec::default()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_out_of_range_pcm_rate_is_unsupported() {
        let raw = AudioBuffer::with_encoding(
            vec![0; 32],
            SourceEncoding::Pcm16 {
                sample_rate: u32::MAX,
                channels: 1,
            },
        );
        assert!(matches!(
            convert_format(&raw, &AudioSpec::default()),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_out_of_range_target_is_rejected() {
        let wav = samples_to_wav(&[0.0; 16], 16000, 1).unwrap();
        let target = AudioSpec {
            sample_rate: 1,
            channels: 1,
        };
        assert!(matches!(
            convert_format(&AudioBuffer::new(wav), &target),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_stereo_wav_downmixed_and_resampled() {
        let stereo: Vec<f32> = (0..4800).flat_map(|_| [0.25_f32, 0.75]).collect();
        let wav = samples_to_wav(&stereo, 48000, 2).unwrap();

        let out = convert_format(&AudioBuffer::new(wav), &AudioSpec::default()).unwrap();
        let (samples, spec) = decode_wav(&out).unwrap();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(samples.len(), 1600);
    }

    #[test]
    fn test_detect_containers() {
        let wav = samples_to_wav(&[0.0; 16], 16000, 1).unwrap();
        assert_eq!(SourceEncoding::detect(&wav).unwrap(), SourceEncoding::Wav);
        assert_eq!(
            SourceEncoding::detect(b"ID3\x04\x00rest").unwrap(),
            SourceEncoding::Mp3
        );
        assert!(SourceEncoding::detect(b"").is_err());
    }

    #[test]
    fn test_energy_and_silence() {
        assert!(rms_energy(&[0.0; 100]) < 0.001);
        assert!(rms_energy(&[0.5; 100]) > 0.4);

        let silent = samples_to_wav(&[0.0; 1600], 16000, 1).unwrap();
        assert!(is_silent(&silent, 0.01).unwrap());

        let loud = samples_to_wav(&[0.5; 1600], 16000, 1).unwrap();
        assert!(!is_silent(&loud, 0.01).unwrap());
    }
}
