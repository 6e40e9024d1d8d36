//! 流描述符.
//!
//! 会话打开时为每个选中的流生成一次, 告诉消费者输出样本的格式.

use violet_core::{MediaType, PixelFormat, Rational};

/// 最小显示区域 (裁剪矩形)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aperture {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// 标称亮度范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NominalRange {
    /// 16-235
    Limited16To235,
    /// 0-255
    Full0To255,
}

/// 隔行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlaceMode {
    /// 逐行
    Progressive,
    /// 逐帧决定 (见样本属性)
    MixedInterlaceOrProgressive,
}

/// 视频流描述符
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDescriptor {
    /// 容器中的流索引
    pub stream_index: usize,
    /// 解码器名称
    pub codec_name: String,
    /// 流标题 (`title` 元数据)
    pub name: Option<String>,
    /// 语言 (`language` 元数据)
    pub language: Option<String>,
    /// 输出像素格式
    pub subtype: PixelFormat,
    /// 解码输出宽度
    pub width: u32,
    /// 解码输出高度
    pub height: u32,
    /// 帧率
    pub frame_rate: Rational,
    /// 码率 (bit/s), 0 表示未知
    pub bit_rate: u64,
    /// 像素宽高比
    pub pixel_aspect_ratio: Option<Rational>,
    /// 旋转角度 (`rotate` 元数据)
    pub rotation: Option<u32>,
    /// 解码尺寸与显示尺寸不同时的最小显示区域
    pub aperture: Option<Aperture>,
    /// 标称范围
    pub nominal_range: Option<NominalRange>,
    /// 隔行模式
    pub interlace_mode: InterlaceMode,
}

/// 音频流描述符
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDescriptor {
    /// 容器中的流索引
    pub stream_index: usize,
    /// 解码器名称
    pub codec_name: String,
    /// 流标题 (`title` 元数据)
    pub name: Option<String>,
    /// 语言 (`language` 元数据)
    pub language: Option<String>,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 输出位深 (交错 S16 固定为 16)
    pub bits_per_sample: u32,
    /// 码率 (bit/s), 0 表示未知
    pub bit_rate: u64,
}

/// 流描述符
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDescriptor {
    Video(VideoDescriptor),
    Audio(AudioDescriptor),
}

impl StreamDescriptor {
    /// 媒体类型
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
        }
    }

    /// 容器中的流索引
    pub fn stream_index(&self) -> usize {
        match self {
            Self::Video(v) => v.stream_index,
            Self::Audio(a) => a.stream_index,
        }
    }
}
