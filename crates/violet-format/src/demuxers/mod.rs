//! 解复用器实现模块.

pub mod avi;
pub mod wav;

use violet_codec::CodecId;
use violet_core::SampleFormat;

use crate::format_id::FormatId;
use crate::registry::FormatRegistry;

/// 注册所有内置解复用器
pub fn register_all_demuxers(registry: &mut FormatRegistry) {
    registry.register_demuxer(FormatId::Wav, "wav", wav::WavDemuxer::create);
    registry.register_probe(Box::new(wav::WavProbe));

    registry.register_demuxer(FormatId::Avi, "avi", avi::AviDemuxer::create);
    registry.register_probe(Box::new(avi::AviProbe));
}

/// 解析 RIFF `LIST/INFO` 子块中的一项, 返回对应的通用元数据键
pub(crate) fn riff_info_key(tag: &[u8; 4]) -> Option<&'static str> {
    Some(match tag {
        b"INAM" => "title",
        b"IART" => "artist",
        b"ICMT" => "comment",
        b"ICRD" => "date",
        b"ISFT" => "encoder",
        b"ILNG" => "language",
        _ => return None,
    })
}

/// 把 INFO 子块的字节值转成字符串 (去掉结尾的 NUL)
pub(crate) fn riff_info_value(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// WAVEFORMATEX 格式码: PCM
pub(crate) const WAVE_FORMAT_PCM: u16 = 0x0001;
/// WAVEFORMATEX 格式码: IEEE 浮点
pub(crate) const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAVEFORMATEX 格式码: 扩展格式, 实际格式码在子格式 GUID 的前两个字节
pub(crate) const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// 根据 WAVEFORMATEX 格式码和位深确定 CodecId, 不认识时返回 None
pub(crate) fn wave_codec_id(format_tag: u16, bits_per_sample: u16) -> Option<CodecId> {
    Some(match (format_tag, bits_per_sample) {
        (WAVE_FORMAT_PCM, 8) => CodecId::PcmU8,
        (WAVE_FORMAT_PCM, 16) => CodecId::PcmS16le,
        (WAVE_FORMAT_PCM, 24) => CodecId::PcmS24le,
        (WAVE_FORMAT_PCM, 32) => CodecId::PcmS32le,
        (WAVE_FORMAT_IEEE_FLOAT, 32) => CodecId::PcmF32le,
        (0x0050 | 0x0055, _) => CodecId::Mp3,
        (0x00FF | 0x1610, _) => CodecId::Aac,
        (0x2000, _) => CodecId::Ac3,
        _ => return None,
    })
}

/// PCM 编解码器解码后的采样格式
pub(crate) fn pcm_sample_format(codec_id: CodecId) -> SampleFormat {
    match codec_id {
        CodecId::PcmU8 => SampleFormat::U8,
        CodecId::PcmS16le | CodecId::PcmS16be => SampleFormat::S16,
        CodecId::PcmS24le | CodecId::PcmS32le => SampleFormat::S32,
        CodecId::PcmF32le => SampleFormat::F32,
        _ => SampleFormat::None,
    }
}
