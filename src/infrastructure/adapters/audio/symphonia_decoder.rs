//! Symphonia Decoder - 基于 symphonia 的音频解码器
//!
//! 支持 WAV 和 MP3 容器（TTS 服务常用输出格式）

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioDecoderPort, AudioError, DecodedAudio};

/// Symphonia 解码器
#[derive(Debug, Default, Clone)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// 根据魔数推测容器格式
    fn hint_for(data: &[u8]) -> Hint {
        let mut hint = Hint::new();
        if data.starts_with(b"RIFF") {
            hint.with_extension("wav");
        } else if data.starts_with(b"ID3")
            || (data.len() > 1 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0)
        {
            hint.with_extension("mp3");
        }
        hint
    }
}

impl AudioDecoderPort for SymphoniaDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedAudio, AudioError> {
        let hint = Self::hint_for(data);
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AudioError::Decode(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioError::Decode("No audio track found".to_string()))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(format!("Decoder creation failed: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    return Err(AudioError::Decode(format!("Packet read error: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::Decode(format!("Decode failed: {}", e)));
                }
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::Decode("Unknown sample format".to_string()));
        }
        if samples.is_empty() {
            return Err(AudioError::Decode("No samples decoded".to_string()));
        }

        Ok(DecodedAudio::new(samples, sample_rate, channels))
    }
}
