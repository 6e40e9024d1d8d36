//! AVI (Audio Video Interleave) 解复用器.
//!
//! AVI 基于 RIFF 格式, 结构如下:
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih (主 AVI 头)
//!     LIST 'strl' (每流一个)
//!       strh (流头)
//!       strf (流格式: BITMAPINFOHEADER 或 WAVEFORMATEX)
//!       strn (流名称, 可选)
//!   LIST 'INFO' (可选元数据)
//!   LIST 'movi' (数据块, 可嵌套 LIST 'rec ')
//!     00dc / 00db (视频数据)
//!     01wb (音频数据)
//!   idx1 (可选旧式索引)
//! ```
//!
//! 打开时建立完整的包索引 (优先使用 idx1, 否则扫描 movi),
//! 之后按索引顺序读包, seek 在索引上查找关键帧.
//!
//! 支持的选项: `use_index` (是否使用 idx1, 默认 true).

use std::io::{Cursor, Read, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use violet_codec::decoders::rawvideo::BOTTOM_UP_MARKER;
use violet_codec::{CodecId, Packet};
use violet_core::timestamp::{TICKS_PER_MICROSECOND, to_ticks};
use violet_core::{
    ChannelLayout, MediaType, NOPTS_VALUE, PixelFormat, Rational, SampleFormat, VioletError,
    VioletResult,
};

use super::{
    WAVE_FORMAT_EXTENSIBLE, pcm_sample_format, riff_info_key, riff_info_value, wave_codec_id,
};
use crate::demuxer::{Demuxer, SeekFlags};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::{AudioStreamParams, Stream, StreamParams, VideoStreamParams};

/// idx1 索引条目标志: 关键帧
const AVIIF_KEYFRAME: u32 = 0x10;

/// strh 中到 dwSampleSize 为止的最小长度
const STRH_MIN_SIZE: usize = 48;
/// BITMAPINFOHEADER 长度
const BITMAPINFOHEADER_SIZE: usize = 40;
/// WAVEFORMAT (不含 cbSize) 长度
const WAVEFORMAT_MIN_SIZE: usize = 16;

/// strh 中关心的字段
#[derive(Debug, Default)]
struct StreamHeader {
    fcc_type: [u8; 4],
    handler: [u8; 4],
    scale: u32,
    rate: u32,
    start: u32,
    length: u32,
    sample_size: u32,
}

/// AVI 流号到对外流的映射
#[derive(Debug)]
struct Track {
    /// 对外流索引 (None 表示该流被忽略)
    stream: Option<usize>,
    /// 音频块对齐 (视频为 0)
    block_align: u32,
    /// 起始时间 (以流 time_base 为单位)
    start: i64,
}

/// 包索引条目
#[derive(Debug, Clone)]
struct IndexEntry {
    /// 对外流索引
    stream: usize,
    /// 数据块头在文件中的绝对位置
    offset: u64,
    /// 数据大小
    size: u32,
    /// 是否为关键帧
    keyframe: bool,
    /// 显示时间戳 (以流 time_base 为单位)
    pts: i64,
    /// 持续时间 (以流 time_base 为单位)
    duration: i64,
}

/// idx1 中的原始条目
struct Idx1Entry {
    chunk_id: [u8; 4],
    flags: u32,
    offset: u32,
    size: u32,
}

/// AVI 解复用器
pub struct AviDemuxer {
    /// 对外流信息
    streams: Vec<Stream>,
    /// 按 AVI 流号排列的轨道
    tracks: Vec<Track>,
    /// movi 列表中 'movi' 标记的位置 (idx1 偏移基准)
    movi_tag_pos: u64,
    /// movi 列表结束位置
    movi_end: u64,
    /// idx1 原始条目
    idx1: Vec<Idx1Entry>,
    /// 包索引 (按存储顺序)
    index: Vec<IndexEntry>,
    /// 下一个要读取的索引位置
    cursor: usize,
    /// 是否使用 idx1
    use_index: bool,
    /// 元数据
    metadata: Vec<(String, String)>,
}

impl AviDemuxer {
    /// 创建 AVI 解复用器实例 (工厂函数)
    pub fn create() -> VioletResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self {
            streams: Vec::new(),
            tracks: Vec::new(),
            movi_tag_pos: 0,
            movi_end: 0,
            idx1: Vec::new(),
            index: Vec::new(),
            cursor: 0,
            use_index: true,
            metadata: Vec::new(),
        }))
    }

    /// 解析块 ID 中的两位流号 (如 "01wb" -> 1)
    fn chunk_stream_number(tag: &[u8; 4]) -> Option<usize> {
        if tag[0].is_ascii_digit() && tag[1].is_ascii_digit() {
            Some(usize::from(tag[0] - b'0') * 10 + usize::from(tag[1] - b'0'))
        } else {
            None
        }
    }

    /// 块 ID 后两位是否为音视频数据
    fn is_media_chunk(tag: &[u8; 4]) -> bool {
        matches!(&tag[2..4], b"dc" | b"db" | b"wb")
    }

    /// 根据 biCompression 和位深确定编解码器与像素格式
    fn resolve_video(compression: u32, bit_count: u16) -> (CodecId, PixelFormat) {
        // BI_RGB / BI_BITFIELDS
        if compression == 0 || compression == 3 {
            let pf = match bit_count {
                8 => PixelFormat::Gray8,
                24 => PixelFormat::Bgr24,
                32 => PixelFormat::Bgra,
                _ => PixelFormat::None,
            };
            let codec = if pf == PixelFormat::None {
                CodecId::None
            } else {
                CodecId::RawVideo
            };
            return (codec, pf);
        }

        let mut fourcc = compression.to_le_bytes();
        fourcc.make_ascii_uppercase();
        match &fourcc {
            b"I420" | b"IYUV" => (CodecId::RawVideo, PixelFormat::Yuv420p),
            b"NV12" => (CodecId::RawVideo, PixelFormat::Nv12),
            b"Y800" | b"GREY" => (CodecId::RawVideo, PixelFormat::Gray8),
            b"H264" | b"X264" | b"AVC1" => (CodecId::H264, PixelFormat::Yuv420p),
            b"H265" | b"HEVC" | b"HVC1" => (CodecId::H265, PixelFormat::Yuv420p),
            b"XVID" | b"DIVX" | b"DX50" | b"MP4V" | b"FMP4" => {
                (CodecId::Mpeg4, PixelFormat::Yuv420p)
            }
            b"MJPG" | b"JPEG" => (CodecId::Mjpeg, PixelFormat::Yuvj420p),
            _ => (CodecId::None, PixelFormat::None),
        }
    }

    fn parse_strh(data: &[u8]) -> VioletResult<StreamHeader> {
        if data.len() < STRH_MIN_SIZE {
            return Err(VioletError::InvalidData(format!(
                "strh 块不足 {} 字节",
                STRH_MIN_SIZE
            )));
        }
        let mut c = Cursor::new(data);
        let mut h = StreamHeader::default();
        c.read_exact(&mut h.fcc_type)?;
        c.read_exact(&mut h.handler)?;
        let _flags = c.read_u32::<LittleEndian>()?;
        let _priority = c.read_u16::<LittleEndian>()?;
        let _language = c.read_u16::<LittleEndian>()?;
        let _initial_frames = c.read_u32::<LittleEndian>()?;
        h.scale = c.read_u32::<LittleEndian>()?;
        h.rate = c.read_u32::<LittleEndian>()?;
        h.start = c.read_u32::<LittleEndian>()?;
        h.length = c.read_u32::<LittleEndian>()?;
        let _suggested_buffer = c.read_u32::<LittleEndian>()?;
        let _quality = c.read_u32::<LittleEndian>()?;
        h.sample_size = c.read_u32::<LittleEndian>()?;
        Ok(h)
    }

    /// 由 strh + strf 建立视频流
    fn build_video_stream(index: usize, h: &StreamHeader, strf: &[u8]) -> VioletResult<Stream> {
        if strf.len() < BITMAPINFOHEADER_SIZE {
            return Err(VioletError::InvalidData(
                "BITMAPINFOHEADER 不足 40 字节".into(),
            ));
        }
        let mut c = Cursor::new(strf);
        let bi_size = c.read_u32::<LittleEndian>()? as usize;
        let width = c.read_i32::<LittleEndian>()?;
        let height = c.read_i32::<LittleEndian>()?;
        let _planes = c.read_u16::<LittleEndian>()?;
        let bit_count = c.read_u16::<LittleEndian>()?;
        let compression = c.read_u32::<LittleEndian>()?;

        let (codec_id, pixel_format) = Self::resolve_video(compression, bit_count);
        if codec_id == CodecId::None {
            warn!(
                "AVI 流 {}: 不认识的视频编码 0x{:08X}/{}",
                index,
                compression,
                String::from_utf8_lossy(&h.handler)
            );
        }

        let (time_base, frame_rate) = if h.scale > 0 && h.rate > 0 {
            (
                Rational::new(h.scale as i32, h.rate as i32).reduce(),
                Rational::new(h.rate as i32, h.scale as i32).reduce(),
            )
        } else {
            warn!("AVI 流 {}: dwScale/dwRate 无效, 按 25fps 处理", index);
            (Rational::new(1, 25), Rational::new(25, 1))
        };

        let mut stream = Stream::new(
            index,
            codec_id,
            time_base,
            StreamParams::Video(VideoStreamParams {
                width: width.unsigned_abs(),
                height: height.unsigned_abs(),
                pixel_format,
                frame_rate,
                avg_frame_rate: frame_rate,
                sample_aspect_ratio: Rational::new(1, 1),
                bit_rate: 0,
            }),
        );

        // DIB 打包格式在 biHeight 为正时行序自下而上
        let packed = pixel_format.plane_count() == 1;
        if codec_id == CodecId::RawVideo && packed && height > 0 && compression == 0 {
            stream.extra_data = BOTTOM_UP_MARKER.to_vec();
        } else if strf.len() > BITMAPINFOHEADER_SIZE && bi_size > BITMAPINFOHEADER_SIZE {
            stream.extra_data = strf[BITMAPINFOHEADER_SIZE..].to_vec();
        }
        stream.start_time = i64::from(h.start);
        stream.duration = i64::from(h.length);
        stream.nb_frames = u64::from(h.length);

        debug!(
            "AVI 视频流 {}: {:?} {}x{} {}, fps={}",
            index,
            codec_id,
            width.unsigned_abs(),
            height.unsigned_abs(),
            pixel_format,
            frame_rate
        );
        Ok(stream)
    }

    /// 由 strh + strf 建立音频流, 同时返回块对齐
    fn build_audio_stream(
        index: usize,
        h: &StreamHeader,
        strf: &[u8],
    ) -> VioletResult<(Stream, u32)> {
        if strf.len() < WAVEFORMAT_MIN_SIZE {
            return Err(VioletError::InvalidData("WAVEFORMATEX 不足 16 字节".into()));
        }
        let mut c = Cursor::new(strf);
        let mut format_tag = c.read_u16::<LittleEndian>()?;
        let channels = c.read_u16::<LittleEndian>()?;
        let sample_rate = c.read_u32::<LittleEndian>()?;
        let avg_bytes = c.read_u32::<LittleEndian>()?;
        let block_align = c.read_u16::<LittleEndian>()?;
        let bits = c.read_u16::<LittleEndian>()?;

        let mut channel_mask = 0;
        if format_tag == WAVE_FORMAT_EXTENSIBLE && strf.len() >= 40 {
            c.set_position(20);
            channel_mask = c.read_u32::<LittleEndian>()?;
            format_tag = c.read_u16::<LittleEndian>()?;
        }
        if sample_rate == 0 {
            return Err(VioletError::InvalidData(format!(
                "AVI 流 {}: 采样率为 0",
                index
            )));
        }

        let codec_id = wave_codec_id(format_tag, bits).unwrap_or_else(|| {
            warn!("AVI 流 {}: 不认识的音频格式码 0x{:04X}", index, format_tag);
            CodecId::None
        });

        let mut stream = Stream::new(
            index,
            codec_id,
            Rational::new(1, sample_rate as i32),
            StreamParams::Audio(AudioStreamParams {
                sample_rate,
                channel_layout: ChannelLayout::from_mask(u32::from(channels), channel_mask),
                sample_format: pcm_sample_format(codec_id),
                bit_rate: u64::from(avg_bytes) * 8,
                frame_size: 0,
            }),
        );
        if pcm_sample_format(codec_id) == SampleFormat::None {
            stream.extra_data = strf.get(18..).map(<[u8]>::to_vec).unwrap_or_default();
        }
        // dwStart 以 dwScale/dwRate 为单位, 换算成采样
        if h.rate > 0 {
            let start = i128::from(h.start) * i128::from(h.scale) * i128::from(sample_rate)
                / i128::from(h.rate);
            stream.start_time = start as i64;
        } else {
            stream.start_time = 0;
        }

        let block_align = if h.sample_size > 0 || block_align > 0 {
            u32::from(block_align.max(1))
        } else {
            0
        };
        debug!(
            "AVI 音频流 {}: {:?} {} Hz, {} 声道, {} 位",
            index, codec_id, sample_rate, channels, bits
        );
        Ok((stream, block_align))
    }

    /// 解析一个 strl 列表 (列表类型之后的内容)
    fn parse_strl(&mut self, io: &mut IoContext, end: u64) -> VioletResult<()> {
        let mut header: Option<StreamHeader> = None;
        let mut strf = Vec::new();
        let mut name: Option<String> = None;

        while io.position()? + 8 <= end {
            let tag = io.read_tag()?;
            let size = io.read_u32_le()?;
            match &tag {
                b"strh" => header = Some(Self::parse_strh(&io.read_bytes(size as usize)?)?),
                b"strf" => strf = io.read_bytes(size as usize)?,
                b"strn" => name = Some(riff_info_value(&io.read_bytes(size as usize)?)),
                _ => io.skip(size as usize)?,
            }
            if size % 2 != 0 {
                io.skip(1)?;
            }
        }
        io.seek(SeekFrom::Start(end))?;

        let Some(h) = header else {
            warn!("strl 中缺少 strh, 忽略该流");
            self.tracks.push(Track {
                stream: None,
                block_align: 0,
                start: 0,
            });
            return Ok(());
        };

        let index = self.streams.len();
        let built = match &h.fcc_type {
            b"vids" => Some(Self::build_video_stream(index, &h, &strf).map(|s| (s, 0))),
            b"auds" => Some(Self::build_audio_stream(index, &h, &strf)),
            other => {
                debug!("忽略 AVI 流类型 '{}'", String::from_utf8_lossy(other));
                None
            }
        };

        match built {
            Some(Ok((mut stream, block_align))) => {
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    stream.metadata.push(("title".into(), name));
                }
                self.tracks.push(Track {
                    stream: Some(index),
                    block_align,
                    start: stream.start_time,
                });
                self.streams.push(stream);
            }
            Some(Err(e)) => {
                warn!("AVI 流解析失败, 忽略: {}", e);
                self.tracks.push(Track {
                    stream: None,
                    block_align: 0,
                    start: 0,
                });
            }
            None => self.tracks.push(Track {
                stream: None,
                block_align: 0,
                start: 0,
            }),
        }
        Ok(())
    }

    fn parse_hdrl(&mut self, io: &mut IoContext, end: u64) -> VioletResult<()> {
        while io.position()? + 8 <= end {
            let tag = io.read_tag()?;
            let size = io.read_u32_le()?;
            let body_start = io.position()?;
            let body_end = body_start + u64::from(size);
            if &tag == b"LIST" && size >= 4 && &io.read_tag()? == b"strl" {
                self.parse_strl(io, body_end)?;
            }
            io.seek(SeekFrom::Start(body_end + u64::from(size % 2)))?;
        }
        Ok(())
    }

    fn parse_info(&mut self, io: &mut IoContext, end: u64) -> VioletResult<()> {
        while io.position()? + 8 <= end {
            let tag = io.read_tag()?;
            let size = io.read_u32_le()?;
            let raw = io.read_bytes(size as usize)?;
            if size % 2 != 0 {
                io.skip(1)?;
            }
            if let Some(key) = riff_info_key(&tag) {
                self.metadata.push((key.to_string(), riff_info_value(&raw)));
            }
        }
        Ok(())
    }

    fn parse_idx1(&mut self, io: &mut IoContext, size: u32) -> VioletResult<()> {
        let count = size as usize / 16;
        self.idx1.reserve(count);
        for _ in 0..count {
            self.idx1.push(Idx1Entry {
                chunk_id: io.read_tag()?,
                flags: io.read_u32_le()?,
                offset: io.read_u32_le()?,
                size: io.read_u32_le()?,
            });
        }
        debug!("idx1: {} 个索引条目", self.idx1.len());
        Ok(())
    }

    /// 为流号 `number` 追加索引条目, 计算时间戳
    fn push_entry(
        &mut self,
        positions: &mut [i64],
        number: usize,
        offset: u64,
        size: u32,
        keyframe: bool,
    ) {
        let Some(track) = self.tracks.get(number) else {
            return;
        };
        let Some(stream) = track.stream else {
            return;
        };
        let (pts, duration) = if track.block_align > 0 {
            let samples = i64::from(size / track.block_align);
            (track.start + positions[number], samples)
        } else {
            (track.start + positions[number], 1)
        };
        positions[number] += duration;
        self.index.push(IndexEntry {
            stream,
            offset,
            size,
            keyframe: keyframe || track.block_align > 0,
            pts,
            duration,
        });
    }

    /// 由 idx1 建立包索引
    fn build_index_from_idx1(&mut self) {
        let Some(first) = self.idx1.iter().find(|e| Self::is_media_chunk(&e.chunk_id)) else {
            return;
        };
        // 偏移通常相对 'movi' 标记, 少数文件写的是绝对偏移
        let base = if u64::from(first.offset) >= self.movi_tag_pos {
            0
        } else {
            self.movi_tag_pos
        };

        let entries = std::mem::take(&mut self.idx1);
        let mut positions = vec![0i64; self.tracks.len()];
        for e in &entries {
            if !Self::is_media_chunk(&e.chunk_id) {
                continue;
            }
            if let Some(number) = Self::chunk_stream_number(&e.chunk_id) {
                let keyframe = e.flags & AVIIF_KEYFRAME != 0;
                self.push_entry(
                    &mut positions,
                    number,
                    base + u64::from(e.offset),
                    e.size,
                    keyframe,
                );
            }
        }
        self.idx1 = entries;
    }

    /// 扫描 movi 列表建立包索引, 无索引时所有数据块按关键帧处理
    fn build_index_by_scan(&mut self, io: &mut IoContext) -> VioletResult<()> {
        let mut positions = vec![0i64; self.tracks.len()];
        let mut pos = self.movi_tag_pos + 4;
        while pos + 8 <= self.movi_end {
            io.seek(SeekFrom::Start(pos))?;
            let tag = io.read_tag()?;
            let size = io.read_u32_le()?;
            if &tag == b"LIST" {
                // 进入 'rec ' 等嵌套列表
                pos += 12;
                continue;
            }
            let next = pos + 8 + u64::from(size) + u64::from(size % 2);
            if next > self.movi_end + 1 {
                warn!("movi 中的块 @{} 被截断, 停止扫描", pos);
                break;
            }
            if Self::is_media_chunk(&tag) {
                if let Some(number) = Self::chunk_stream_number(&tag) {
                    self.push_entry(&mut positions, number, pos, size, true);
                }
            }
            pos = next;
        }
        debug!("扫描 movi 得到 {} 个数据块", self.index.len());
        Ok(())
    }

    /// 索引建立后回填流时长
    fn fill_stream_durations(&mut self) {
        for stream in &mut self.streams {
            if stream.media_type != MediaType::Audio {
                continue;
            }
            let total: i64 = self
                .index
                .iter()
                .filter(|e| e.stream == stream.index)
                .map(|e| e.duration)
                .sum();
            stream.duration = total;
            stream.nb_frames = total.max(0) as u64;
        }
    }
}

impl Demuxer for AviDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Avi
    }

    fn name(&self) -> &str {
        "avi"
    }

    fn set_option(&mut self, key: &str, value: &str) -> VioletResult<()> {
        match key {
            "use_index" => {
                self.use_index = match value {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => {
                        return Err(VioletError::InvalidArgument(format!(
                            "use_index 不是布尔值: {}",
                            value
                        )));
                    }
                };
                Ok(())
            }
            _ => Err(VioletError::Unsupported(format!("avi 不支持选项 {}", key))),
        }
    }

    fn open(&mut self, io: &mut IoContext) -> VioletResult<()> {
        if &io.read_tag()? != b"RIFF" {
            return Err(VioletError::InvalidData("不是有效的 RIFF 文件".into()));
        }
        let _file_size = io.read_u32_le()?;
        if &io.read_tag()? != b"AVI " {
            return Err(VioletError::InvalidData("不是有效的 AVI 文件".into()));
        }

        let mut movi_found = false;
        loop {
            let tag = match io.read_tag() {
                Ok(tag) => tag,
                Err(VioletError::Eof) => break,
                Err(e) => return Err(e),
            };
            let size = match io.read_u32_le() {
                Ok(size) => size,
                Err(VioletError::Eof) => break,
                Err(e) => return Err(e),
            };
            let body_start = io.position()?;
            let mut body_end = body_start + u64::from(size);

            match &tag {
                b"LIST" if size >= 4 => match &io.read_tag()? {
                    b"hdrl" => self.parse_hdrl(io, body_end)?,
                    b"INFO" => self.parse_info(io, body_end)?,
                    b"movi" => {
                        // 流式写出的文件 movi 大小可能为 0 或超出文件
                        if let Some(file_size) = io.size() {
                            if size == 0 || body_end > file_size {
                                body_end = file_size;
                            }
                        }
                        self.movi_tag_pos = body_start;
                        self.movi_end = body_end;
                        movi_found = true;
                    }
                    _ => {}
                },
                b"idx1" => self.parse_idx1(io, size)?,
                _ => {}
            }

            let next = body_end + u64::from(size % 2);
            if io.size().is_some_and(|s| next >= s) {
                break;
            }
            io.seek(SeekFrom::Start(next))?;
        }

        if self.streams.is_empty() {
            return Err(VioletError::InvalidData("AVI 文件中未找到有效流".into()));
        }
        if !movi_found {
            return Err(VioletError::InvalidData("AVI 文件中未找到 movi 列表".into()));
        }

        if self.use_index && !self.idx1.is_empty() {
            self.build_index_from_idx1();
        }
        if self.index.is_empty() {
            if self.use_index {
                debug!("idx1 不可用, 扫描 movi 建立索引");
            }
            self.build_index_by_scan(io)?;
        }
        self.fill_stream_durations();
        self.cursor = 0;

        debug!(
            "AVI 打开完成: {} 个流, {} 个数据包",
            self.streams.len(),
            self.index.len()
        );
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> VioletResult<Packet> {
        let Some(entry) = self.index.get(self.cursor).cloned() else {
            return Err(VioletError::Eof);
        };
        self.cursor += 1;

        io.seek(SeekFrom::Start(entry.offset + 8))?;
        let data = io.read_bytes(entry.size as usize)?;

        let mut pkt = Packet::from_data(data);
        pkt.stream_index = entry.stream;
        pkt.pts = entry.pts;
        pkt.dts = entry.pts;
        pkt.duration = entry.duration;
        pkt.time_base = self.streams[entry.stream].time_base;
        pkt.is_keyframe = entry.keyframe;
        pkt.pos = entry.offset as i64;
        Ok(pkt)
    }

    fn seek(
        &mut self,
        io: &mut IoContext,
        stream_index: usize,
        timestamp: i64,
        flags: SeekFlags,
    ) -> VioletResult<()> {
        if !io.is_seekable() {
            return Err(VioletError::Unsupported("不支持在非可寻址流上 seek".into()));
        }
        if stream_index >= self.streams.len() {
            return Err(VioletError::InvalidArgument(format!(
                "流索引越界: {}",
                stream_index
            )));
        }

        let candidates = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, e)| e.stream == stream_index && (e.keyframe || flags.any));

        let mut before = None;
        let mut after = None;
        for (i, e) in candidates {
            if e.pts <= timestamp {
                before = Some(i);
            } else if after.is_none() {
                after = Some(i);
            }
        }
        let chosen = if flags.backward {
            before.or(after)
        } else {
            after.or(before)
        };
        let Some(cursor) = chosen else {
            return Err(VioletError::InvalidData(format!(
                "流 {} 没有可定位的数据包",
                stream_index
            )));
        };

        self.cursor = cursor;
        debug!(
            "AVI seek: 流 {} 目标 {}, 落在 pts={}",
            stream_index, timestamp, self.index[cursor].pts
        );
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.streams
            .iter()
            .filter(|s| s.time_base.is_valid() && s.duration > 0)
            .map(|s| s.duration as f64 * s.time_base.to_f64())
            .reduce(f64::max)
    }

    fn start_time(&self) -> Option<i64> {
        self.streams
            .iter()
            .filter(|s| s.start_time != NOPTS_VALUE && s.time_base.is_valid())
            .map(|s| to_ticks(s.start_time, s.time_base) / TICKS_PER_MICROSECOND)
            .min()
    }

    fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

/// AVI 格式探测器
pub struct AviProbe;

impl FormatProbe for AviProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"AVI " {
            return Some(SCORE_MAX);
        }
        filename
            .filter(|name| FormatId::Avi.matches_extension(name))
            .map(|_| SCORE_EXTENSION)
    }

    fn format_id(&self) -> FormatId {
        FormatId::Avi
    }
}
