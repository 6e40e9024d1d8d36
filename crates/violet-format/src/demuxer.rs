//! 解复用器 (Demuxer) trait 定义.

use violet_codec::Packet;
use violet_core::{VioletError, VioletResult};

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 解复用器 trait
///
/// 使用流程:
/// 1. 可选: 调用 `set_option()` 传入容器选项
/// 2. 调用 `open()` 打开容器并解析头部
/// 3. 调用 `streams()` 获取流信息
/// 4. 循环调用 `read_packet()`, 按容器存储顺序读取数据包
/// 5. 可选: 调用 `seek()` 进行定位
pub trait Demuxer: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取格式名称
    fn name(&self) -> &str;

    /// 设置一个容器选项, 必须在 `open()` 之前调用
    ///
    /// 不认识的键或非法的值返回错误, 调用方记录后丢弃.
    fn set_option(&mut self, key: &str, _value: &str) -> VioletResult<()> {
        Err(VioletError::Unsupported(format!(
            "{} 不支持选项 {}",
            self.name(),
            key
        )))
    }

    /// 打开容器并解析头部信息
    fn open(&mut self, io: &mut IoContext) -> VioletResult<()>;

    /// 获取所有流信息
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功读取一个数据包
    /// - `Err(VioletError::Eof)`: 已到达文件末尾
    fn read_packet(&mut self, io: &mut IoContext) -> VioletResult<Packet>;

    /// 定位到指定时间点
    ///
    /// # 参数
    /// - `stream_index`: 目标流索引
    /// - `timestamp`: 目标时间戳 (以该流的 time_base 为单位)
    /// - `flags`: Seek 标志
    fn seek(
        &mut self,
        io: &mut IoContext,
        stream_index: usize,
        timestamp: i64,
        flags: SeekFlags,
    ) -> VioletResult<()>;

    /// 获取容器时长 (秒), None 表示未知
    fn duration(&self) -> Option<f64>;

    /// 容器起始时间 (微秒), None 表示未设置
    fn start_time(&self) -> Option<i64> {
        None
    }

    /// 获取容器元数据
    fn metadata(&self) -> &[(String, String)] {
        &[]
    }
}

/// Seek 标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekFlags {
    /// 向后 seek (寻找目标之前最近的关键帧)
    pub backward: bool,
    /// 寻找任意帧 (不仅是关键帧)
    pub any: bool,
}

impl Default for SeekFlags {
    fn default() -> Self {
        Self {
            backward: true,
            any: false,
        }
    }
}
