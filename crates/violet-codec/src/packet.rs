//! 压缩数据包 (Packet).
//!
//! 从容器中读出的一块压缩数据. 包在 Reader → 队列 → 解码器之间按值移动,
//! 不实现 `Clone`, 保证每个包最多入队一次、出队一次.

use bytes::Bytes;
use violet_core::{NOPTS_VALUE, Rational};

/// 压缩数据包
#[derive(Debug)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS), `NOPTS_VALUE` 表示未知
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 数据包时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 在容器中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包 (送入解码器表示刷新)
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush packet)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// PTS 是否已知
    pub fn has_pts(&self) -> bool {
        self.pts != NOPTS_VALUE
    }
}
