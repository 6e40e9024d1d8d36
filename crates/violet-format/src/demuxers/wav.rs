//! WAV (RIFF WAVE) 解复用器.
//!
//! WAV 文件结构:
//! ```text
//! RIFF header:  "RIFF" + file_size-8 + "WAVE"
//! fmt  chunk:   "fmt " + chunk_size + audio_format + channels + sample_rate
//!              + byte_rate + block_align + bits_per_sample [+ 扩展]
//! LIST chunk:   "LIST" + size + "INFO" + 若干子块 (可选)
//! data chunk:   "data" + data_size + PCM samples...
//! ```
//!
//! 支持的选项: `packet_samples` (每个数据包的采样数, 默认 4096).

use log::{debug, warn};
use violet_codec::{CodecId, Packet};
use violet_core::{ChannelLayout, Rational, SampleFormat, VioletError, VioletResult};

use super::{
    WAVE_FORMAT_EXTENSIBLE, pcm_sample_format, riff_info_key, riff_info_value, wave_codec_id,
};
use crate::demuxer::{Demuxer, SeekFlags};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::{AudioStreamParams, Stream, StreamParams};

/// 默认每包采样数
const DEFAULT_PACKET_SAMPLES: u32 = 4096;

/// WAV 解复用器
pub struct WavDemuxer {
    /// 流信息
    streams: Vec<Stream>,
    /// data 块在文件中的起始偏移
    data_offset: u64,
    /// data 块的大小 (字节)
    data_size: u64,
    /// 当前读取位置 (相对于 data 块起始)
    data_pos: u64,
    /// 每个数据包的采样数
    packet_samples: u32,
    /// 块对齐 (每个采样块的字节数)
    block_align: u16,
    /// 采样率 (用于计算时间戳)
    sample_rate: u32,
    /// 元数据
    metadata: Vec<(String, String)>,
}

/// fmt 块的内容
struct WavFormat {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    channel_mask: u32,
}

impl WavDemuxer {
    /// 创建 WAV 解复用器实例 (工厂函数)
    pub fn create() -> VioletResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self {
            streams: Vec::new(),
            data_offset: 0,
            data_size: 0,
            data_pos: 0,
            packet_samples: DEFAULT_PACKET_SAMPLES,
            block_align: 0,
            sample_rate: 0,
            metadata: Vec::new(),
        }))
    }

    fn read_fmt_chunk(io: &mut IoContext, chunk_size: u64) -> VioletResult<WavFormat> {
        if chunk_size < 16 {
            return Err(VioletError::InvalidData("fmt 块大小不足 16 字节".into()));
        }
        let mut fmt = WavFormat {
            audio_format: io.read_u16_le()?,
            channels: io.read_u16_le()?,
            sample_rate: io.read_u32_le()?,
            block_align: 0,
            bits_per_sample: 0,
            channel_mask: 0,
        };
        let _byte_rate = io.read_u32_le()?;
        fmt.block_align = io.read_u16_le()?;
        fmt.bits_per_sample = io.read_u16_le()?;
        let mut consumed = 16u64;

        if fmt.audio_format == WAVE_FORMAT_EXTENSIBLE && chunk_size >= 40 {
            let _cb_size = io.read_u16_le()?;
            let _valid_bits = io.read_u16_le()?;
            fmt.channel_mask = io.read_u32_le()?;
            let guid = io.read_bytes(16)?;
            fmt.audio_format = u16::from_le_bytes([guid[0], guid[1]]);
            consumed = 40;
        }
        if chunk_size > consumed {
            io.skip((chunk_size - consumed) as usize)?;
        }

        debug!(
            "fmt: format={}, channels={}, rate={}, block_align={}, bits={}",
            fmt.audio_format, fmt.channels, fmt.sample_rate, fmt.block_align, fmt.bits_per_sample,
        );
        Ok(fmt)
    }

    fn read_list_chunk(&mut self, io: &mut IoContext, chunk_size: u64) -> VioletResult<()> {
        if chunk_size < 4 {
            io.skip(chunk_size as usize)?;
            return Ok(());
        }
        let list_type = io.read_tag()?;
        let mut left = chunk_size - 4;
        if &list_type != b"INFO" {
            io.skip(left as usize)?;
            return Ok(());
        }
        while left >= 8 {
            let tag = io.read_tag()?;
            let size = u64::from(io.read_u32_le()?);
            let padded = size + (size & 1);
            if padded + 8 > left {
                io.skip((left - 8) as usize)?;
                break;
            }
            let raw = io.read_bytes(size as usize)?;
            if size & 1 == 1 {
                io.skip(1)?;
            }
            if let Some(key) = riff_info_key(&tag) {
                self.metadata.push((key.to_string(), riff_info_value(&raw)));
            }
            left -= padded + 8;
        }
        Ok(())
    }
}

impl Demuxer for WavDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }

    fn name(&self) -> &str {
        "wav"
    }

    fn set_option(&mut self, key: &str, value: &str) -> VioletResult<()> {
        match key {
            "packet_samples" => {
                let samples: u32 = value.parse().map_err(|_| {
                    VioletError::InvalidArgument(format!("packet_samples 不是整数: {}", value))
                })?;
                if samples == 0 {
                    return Err(VioletError::InvalidArgument(
                        "packet_samples 不能为 0".into(),
                    ));
                }
                self.packet_samples = samples;
                Ok(())
            }
            _ => Err(VioletError::Unsupported(format!("wav 不支持选项 {}", key))),
        }
    }

    fn open(&mut self, io: &mut IoContext) -> VioletResult<()> {
        if &io.read_tag()? != b"RIFF" {
            return Err(VioletError::InvalidData("不是有效的 RIFF 文件".into()));
        }
        let _file_size = io.read_u32_le()?;
        if &io.read_tag()? != b"WAVE" {
            return Err(VioletError::InvalidData("不是有效的 WAVE 文件".into()));
        }

        let mut fmt: Option<WavFormat> = None;
        let mut data_found = false;

        while !data_found {
            let chunk_id = match io.read_tag() {
                Ok(tag) => tag,
                Err(VioletError::Eof) => break,
                Err(e) => return Err(e),
            };
            let chunk_size = u64::from(io.read_u32_le()?);

            match &chunk_id {
                b"fmt " => fmt = Some(Self::read_fmt_chunk(io, chunk_size)?),
                b"LIST" => self.read_list_chunk(io, chunk_size)?,
                b"data" => {
                    if fmt.is_none() {
                        return Err(VioletError::InvalidData("data 块出现在 fmt 块之前".into()));
                    }
                    self.data_offset = io.position()?;
                    // 流式写出的文件常把 data 大小写成 0 或 0xFFFFFFFF
                    let available = io.size().map(|s| s.saturating_sub(self.data_offset));
                    self.data_size = match available {
                        Some(avail) if chunk_size == 0 || chunk_size > avail => avail,
                        _ => chunk_size,
                    };
                    data_found = true;
                    debug!("data: offset={}, size={}", self.data_offset, self.data_size);
                }
                _ => {
                    warn!(
                        "跳过未知块: '{}', 大小={}",
                        String::from_utf8_lossy(&chunk_id),
                        chunk_size
                    );
                    io.skip(chunk_size as usize)?;
                }
            }

            // RIFF 块按偶数对齐
            if !data_found && chunk_size % 2 != 0 {
                io.skip(1)?;
            }
        }

        let fmt = fmt.ok_or_else(|| VioletError::InvalidData("未找到 fmt 块".into()))?;
        if !data_found {
            return Err(VioletError::InvalidData("未找到 data 块".into()));
        }
        if fmt.sample_rate == 0 || fmt.block_align == 0 || fmt.channels == 0 {
            return Err(VioletError::InvalidData(
                "采样率、声道数或 block_align 为 0".into(),
            ));
        }

        let codec_id = wave_codec_id(fmt.audio_format, fmt.bits_per_sample)
            .filter(|id| pcm_sample_format(*id) != SampleFormat::None)
            .ok_or_else(|| {
                VioletError::Unsupported(format!(
                    "不支持的 WAV 格式: 格式码=0x{:04X}, 位深={}",
                    fmt.audio_format, fmt.bits_per_sample
                ))
            })?;
        let channels = u32::from(fmt.channels);
        let total_samples = self.data_size / u64::from(fmt.block_align);
        let bit_rate =
            u64::from(fmt.sample_rate) * u64::from(fmt.channels) * u64::from(fmt.bits_per_sample);

        let mut stream = Stream::new(
            0,
            codec_id,
            Rational::new(1, fmt.sample_rate as i32),
            StreamParams::Audio(AudioStreamParams {
                sample_rate: fmt.sample_rate,
                channel_layout: ChannelLayout::from_mask(channels, fmt.channel_mask),
                sample_format: pcm_sample_format(codec_id),
                bit_rate,
                frame_size: 0,
            }),
        );
        stream.duration = total_samples as i64;
        stream.start_time = 0;
        stream.nb_frames = total_samples;
        stream.metadata = self.metadata.clone();

        self.streams = vec![stream];
        self.block_align = fmt.block_align;
        self.sample_rate = fmt.sample_rate;
        self.data_pos = 0;

        debug!(
            "WAV 打开完成: {} Hz, {} 声道, {} 位, 总采样数={}",
            fmt.sample_rate, fmt.channels, fmt.bits_per_sample, total_samples,
        );
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> VioletResult<Packet> {
        let ba = u64::from(self.block_align);
        if ba == 0 || self.data_pos >= self.data_size {
            return Err(VioletError::Eof);
        }

        // 本次读取大小: 不超过剩余数据, 对齐到 block_align
        let wanted = u64::from(self.packet_samples) * ba;
        let remaining = self.data_size - self.data_pos;
        let aligned_size = (wanted.min(remaining) / ba) * ba;
        if aligned_size == 0 {
            return Err(VioletError::Eof);
        }

        let data = io.read_bytes(aligned_size as usize)?;

        let mut pkt = Packet::from_data(data);
        pkt.stream_index = 0;
        pkt.pts = (self.data_pos / ba) as i64;
        pkt.dts = pkt.pts;
        pkt.duration = (aligned_size / ba) as i64;
        pkt.time_base = Rational::new(1, self.sample_rate as i32);
        pkt.is_keyframe = true;
        pkt.pos = (self.data_offset + self.data_pos) as i64;

        self.data_pos += aligned_size;
        Ok(pkt)
    }

    fn seek(
        &mut self,
        io: &mut IoContext,
        _stream_index: usize,
        timestamp: i64,
        _flags: SeekFlags,
    ) -> VioletResult<()> {
        if !io.is_seekable() {
            return Err(VioletError::Unsupported("不支持在非可寻址流上 seek".into()));
        }
        if self.block_align == 0 {
            return Err(VioletError::InvalidData("block_align 为 0, 无法 seek".into()));
        }

        // PCM 每个采样都是"关键帧", 时间戳即采样序号
        let ba = u64::from(self.block_align);
        let sample = timestamp.max(0) as u64;
        let aligned_offset = ((sample * ba).min(self.data_size) / ba) * ba;

        io.seek(std::io::SeekFrom::Start(self.data_offset + aligned_offset))?;
        self.data_pos = aligned_offset;

        debug!("WAV seek: 目标采样={}, 字节偏移={}", sample, aligned_offset);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        if self.sample_rate > 0 && self.block_align > 0 {
            let total_samples = self.data_size / u64::from(self.block_align);
            Some(total_samples as f64 / f64::from(self.sample_rate))
        } else {
            None
        }
    }

    fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

/// WAV 格式探测器
pub struct WavProbe;

impl FormatProbe for WavProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Some(SCORE_MAX);
        }
        filename
            .filter(|name| FormatId::Wav.matches_extension(name))
            .map(|_| SCORE_EXTENSION)
    }

    fn format_id(&self) -> FormatId {
        FormatId::Wav
    }
}
