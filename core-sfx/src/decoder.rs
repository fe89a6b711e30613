//! # Symphonia Decoder
//!
//! Default [`SampleDecoder`]: decodes a whole in-memory asset to interleaved
//! f32 PCM. Sound effects are short, so the entire clip is decoded up front
//! on the blocking pool and shared by every playback.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    PcmBuffer, SampleDecoder,
};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Corrupt packets tolerated in a row before the asset is rejected.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SampleDecoder for SymphoniaDecoder {
    async fn decode(&self, data: Bytes, extension_hint: Option<&str>) -> Result<PcmBuffer> {
        let hint = extension_hint.map(str::to_string);
        core_async::task::spawn_blocking(move || decode_all(data, hint.as_deref()))
            .await
            .map_err(|e| BridgeError::Decode(format!("decoder task failed: {}", e)))?
    }
}

/// Decodes every packet of the first audio track.
pub fn decode_all(data: Bytes, extension_hint: Option<&str>) -> Result<PcmBuffer> {
    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let source = Box::new(Cursor::new(data.to_vec())) as Box<dyn MediaSource>;
    let stream = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BridgeError::Decode(format!("unrecognized format: {}", e)))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| BridgeError::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BridgeError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut consecutive_errors = 0;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                debug!("Track list changed mid-stream; keeping what was decoded");
                break;
            }
            Err(e) => return Err(BridgeError::Decode(format!("read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(e @ (SymphoniaError::DecodeError(_) | SymphoniaError::IoError(_)))
                if consecutive_errors < MAX_CONSECUTIVE_ERRORS =>
            {
                consecutive_errors += 1;
                warn!(attempt = consecutive_errors, error = %e, "Skipping undecodable packet");
            }
            Err(e) => return Err(BridgeError::Decode(format!("decode failed: {}", e))),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(BridgeError::Decode("stream has no sample format".to_string()));
    }

    debug!(
        sample_rate,
        channels,
        samples = samples.len(),
        "Asset decoded"
    );

    Ok(PcmBuffer::new(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit PCM WAV with `frames` frames of a square wave.
    fn wav(sample_rate: u32, channels: u16, frames: usize) -> Bytes {
        let data_len = (frames * channels as usize * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for frame in 0..frames {
            let value: i16 = if (frame / 20) % 2 == 0 { 8_000 } else { -8_000 };
            for _ in 0..channels {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        Bytes::from(out)
    }

    #[core_async::test]
    async fn test_decodes_wav() {
        let buffer = SymphoniaDecoder::new()
            .decode(wav(8_000, 2, 800), Some("wav"))
            .await
            .unwrap();

        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 800);
        assert!(buffer.samples().iter().all(|s| s.abs() <= 1.0));
    }

    #[core_async::test]
    async fn test_rejects_garbage() {
        let result = SymphoniaDecoder::new()
            .decode(Bytes::from_static(b"definitely not audio"), Some("mp3"))
            .await;
        assert!(matches!(result, Err(BridgeError::Decode(_))));
    }

    #[test]
    fn test_empty_payload_fails() {
        assert!(decode_all(Bytes::new(), None).is_err());
    }
}
