//! 流信息定义.
//!
//! 描述容器中的一条音视频流. 打开后不可变, 由解复用器持有.

use bitflags::bitflags;
use violet_codec::CodecId;
use violet_core::{ChannelLayout, MediaType, NOPTS_VALUE, PixelFormat, Rational, SampleFormat};

bitflags! {
    /// 流处置标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Disposition: u32 {
        /// 默认流
        const DEFAULT     = 1 << 0;
        /// 附加图片 (如封面), 不是真正的视频流
        const ATTACHED_PIC = 1 << 1;
    }
}

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 起始时间 (以 time_base 为单位, `NOPTS_VALUE` 表示未知)
    pub start_time: i64,
    /// 总帧数 (0 表示未知)
    pub nb_frames: u64,
    /// 编解码器私有数据 (extradata)
    pub extra_data: Vec<u8>,
    /// 处置标志
    pub disposition: Disposition,
    /// 流特定参数
    pub params: StreamParams,
    /// 元数据 (title, language, rotate 等)
    pub metadata: Vec<(String, String)>,
}

impl Stream {
    /// 创建只带基本信息的流, 其余字段取"未知"
    pub fn new(index: usize, codec_id: CodecId, time_base: Rational, params: StreamParams) -> Self {
        let media_type = match params {
            StreamParams::Video(_) => MediaType::Video,
            StreamParams::Audio(_) => MediaType::Audio,
            StreamParams::Other => codec_id.media_type(),
        };
        Self {
            index,
            media_type,
            codec_id,
            time_base,
            duration: -1,
            start_time: NOPTS_VALUE,
            nb_frames: 0,
            extra_data: Vec::new(),
            disposition: Disposition::empty(),
            params,
            metadata: Vec::new(),
        }
    }

    /// 按键查找元数据
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// 获取视频参数 (如果是视频流)
    pub fn video(&self) -> Option<&VideoStreamParams> {
        match &self.params {
            StreamParams::Video(v) => Some(v),
            _ => None,
        }
    }

    /// 获取音频参数 (如果是音频流)
    pub fn audio(&self) -> Option<&AudioStreamParams> {
        match &self.params {
            StreamParams::Audio(a) => Some(a),
            _ => None,
        }
    }
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    /// 视频流参数
    Video(VideoStreamParams),
    /// 音频流参数
    Audio(AudioStreamParams),
    /// 其他
    Other,
}

/// 视频流参数
#[derive(Debug, Clone)]
pub struct VideoStreamParams {
    /// 显示宽度 (像素)
    pub width: u32,
    /// 显示高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 编码帧率 (未知为 0/0)
    pub frame_rate: Rational,
    /// 容器统计的平均帧率 (未知为 0/0)
    pub avg_frame_rate: Rational,
    /// 采样宽高比 (SAR)
    pub sample_aspect_ratio: Rational,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
    /// 每帧采样数 (0 表示可变)
    pub frame_size: u32,
}
