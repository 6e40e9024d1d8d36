//! 输出样本.

use bytes::Bytes;

/// 色度采样位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSiting {
    /// MPEG-2 (水平靠左, 垂直居中)
    Mpeg2,
    /// MPEG-1 (水平垂直都居中)
    Mpeg1,
    /// DV PAL (隔行, 左上)
    DvPal,
    /// 与亮度共址 (逐行, 左上)
    Cosited,
}

/// 视频样本附加属性, 未知项为 `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleProperties {
    /// 是否隔行
    pub interlaced: Option<bool>,
    /// 底场优先 (仅隔行)
    pub bottom_field_first: Option<bool>,
    /// 重复首场 (仅隔行)
    pub repeat_first_field: Option<bool>,
    /// 色度采样位置
    pub chroma_siting: Option<ChromaSiting>,
}

/// 解码并转换后的媒体样本
#[derive(Debug, Clone)]
pub struct MediaSample {
    /// 转换后的数据 (NV12/IYUV/BGRA 或交错 S16)
    pub data: Bytes,
    /// 展示时间戳 (100ns 刻度, 已扣除起始偏移)
    pub timestamp: i64,
    /// 时长 (100ns 刻度)
    pub duration: i64,
    /// 定位或重置后的第一个样本
    pub discontinuous: bool,
    /// 视频附加属性
    pub properties: SampleProperties,
}
