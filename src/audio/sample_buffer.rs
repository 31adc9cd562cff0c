use std::io::{Cursor, ErrorKind};

use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::frame::StereoFrame;
use crate::error::LoadError;

// decoded audio, one Vec per channel, tagged with the rate it was recorded at
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self { sample_rate, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // length in frames
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    // mono is duplicated to both sides, anything past stereo is ignored
    pub fn frame(&self, index: usize) -> StereoFrame {
        match self.channels.as_slice() {
            [] => StereoFrame::zero(),
            [mono] => StereoFrame::mono(mono.get(index).copied().unwrap_or(0.0)),
            [left, right, ..] => StereoFrame {
                left: left.get(index).copied().unwrap_or(0.0),
                right: right.get(index).copied().unwrap_or(0.0),
            },
        }
    }

    // every channel reversed on its own: out[c][i] == in[c][len - 1 - i]
    pub fn reversed(&self) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|ch| ch.iter().rev().copied().collect())
                .collect(),
        }
    }

    // Decode a whole sample file at its own rate and channel count. Plain WAV
    // goes through hound, everything else (and WAV hound can't read) through
    // symphonia, with `extension` as a format hint.
    pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, LoadError> {
        if is_riff_wave(&bytes) {
            match Self::decode_wav(&bytes) {
                Err(LoadError::Decode(hound::Error::Unsupported)) => {}
                other => return other,
            }
        }
        Self::decode_media(bytes, extension)
    }

    // Decode WAV bytes into a buffer at the file's own rate and channel count.
    pub fn decode_wav(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channel_count = spec.channels as usize;
        if channel_count == 0 {
            return Err(LoadError::NoChannels);
        }

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }

        Ok(Self::new(spec.sample_rate, channels))
    }

    // flac, mp3, ogg, aiff and anything else symphonia recognizes
    pub fn decode_media(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, LoadError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();
        let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        let mut sample_rate = params.sample_rate;
        let mut channels: Vec<Vec<f32>> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(error = e, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channel_count = spec.channels.count();
            if channel_count == 0 {
                return Err(LoadError::NoChannels);
            }
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            }
            sample_rate.get_or_insert(spec.rate);

            let mut interleaved =
                symphonia::core::audio::SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);
            for frame in interleaved.samples().chunks_exact(channel_count) {
                for (ch, &s) in channels.iter_mut().zip(frame) {
                    ch.push(s);
                }
            }
        }

        if channels.is_empty() {
            return Err(LoadError::NoChannels);
        }
        Ok(Self::new(sample_rate.unwrap_or(0), channels))
    }
}

fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}
