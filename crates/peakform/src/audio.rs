use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::{FlowError, FlowResult};
use crate::providers::base::RawAudio;

pub const WAV_CHANNELS: u16 = 1;
pub const WAV_BITS_PER_SAMPLE: u16 = 16;
pub const WAV_DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Package a provider's raw speech payload as a `data:audio/wav;base64,...`
/// URI: the PCM samples wrapped in a mono 16-bit WAV container at the
/// payload's sample rate.
///
/// Only linear PCM payloads are recognizable; anything else (or an empty
/// payload) is `InvalidMedia`, never a partial result.
pub fn wav_data_uri(audio: &RawAudio) -> FlowResult<String> {
    if audio.data.is_empty() {
        return Err(FlowError::InvalidMedia("empty audio payload".to_string()));
    }

    let sample_rate = parse_pcm_rate(&audio.mime_type).ok_or_else(|| {
        FlowError::InvalidMedia(format!("unsupported media type `{}`", audio.mime_type))
    })?;

    let wav = pcm_to_wav(&audio.data, sample_rate, WAV_CHANNELS, WAV_BITS_PER_SAMPLE);
    Ok(format!("data:audio/wav;base64,{}", STANDARD.encode(wav)))
}

/// Extract the sample rate from a PCM media type such as
/// `audio/pcm;rate=24000` or `audio/L16;rate=24000`. Non-PCM types are not
/// recognizable. A PCM type without a rate parameter defaults to 24 kHz.
pub fn parse_pcm_rate(mime_type: &str) -> Option<u32> {
    let mut parts = mime_type.split(';').map(str::trim);
    let essence = parts.next()?.to_lowercase();
    if !matches!(essence.as_str(), "audio/pcm" | "audio/l16" | "audio/x-pcm") {
        return None;
    }

    for param in parts {
        if let Some(rate) = param.strip_prefix("rate=") {
            return rate.parse().ok();
        }
    }
    Some(WAV_DEFAULT_SAMPLE_RATE)
}

/// Wrap raw PCM sample bytes in a WAV (RIFF) container.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16, bits_per_sample: u16) -> Vec<u8> {
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // linear PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
