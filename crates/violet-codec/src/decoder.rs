//! 解码器 trait 定义.

use violet_core::{PixelFormat, VioletError, VioletResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `open()` 提供参数
/// 2. 调用 `send_packet()` 送入压缩数据
/// 3. 调用 `receive_frame()` 取出解码后的帧
/// 4. 送入空包 (flush) 以获取解码器中缓存的帧
///
/// 视频解码器还可以参与像素格式协商: 管线在 `open()` 之后读取
/// `pixel_format_candidates()`, 选定后调用 `select_pixel_format()`.
/// 候选列表可以依赖打开参数, 打开前可能为空.
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数配置解码器
    ///
    /// 默认实现为空操作, 允许不需要额外配置的解码器跳过此步骤.
    fn open(&mut self, _params: &CodecParameters) -> VioletResult<()> {
        Ok(())
    }

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(VioletError::NeedMoreData)`: 内部缓冲区已满, 需要先取出帧
    /// - `Err(VioletError::InvalidData)`: 数据包损坏, 调用方可跳过后继续
    fn send_packet(&mut self, packet: &Packet) -> VioletResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(VioletError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(VioletError::Eof)`: 所有帧已取出
    fn receive_frame(&mut self) -> VioletResult<Frame>;

    /// 刷新解码器, 清空内部状态
    ///
    /// 用于 seek 后重置解码器状态.
    fn flush(&mut self);

    /// 解码器可输出的像素格式, 按偏好排序
    ///
    /// 空列表表示不参与协商 (输出格式由码流决定).
    fn pixel_format_candidates(&self) -> Vec<PixelFormat> {
        Vec::new()
    }

    /// 指定解码输出的像素格式, 必须是候选之一
    fn select_pixel_format(&mut self, format: PixelFormat) -> VioletResult<()> {
        Err(VioletError::Unsupported(format!(
            "{} 不支持选择输出格式 {}",
            self.name(),
            format
        )))
    }

    /// 解码输出的图像尺寸 (宽, 高)
    ///
    /// 可能大于容器声明的显示尺寸 (例如按宏块对齐). 未知时返回 `None`.
    fn output_dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}
