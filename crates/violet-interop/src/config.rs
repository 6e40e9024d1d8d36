//! 会话配置.
//!
//! 可由 serde 从 JSON 等格式加载, 缺省字段取默认值.

use serde::{Deserialize, Serialize};
use violet_codec::ThreadType;
use violet_core::PixelFormat;

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropConfig {
    /// 允许输出 IYUV (YUV 4:2:0 三平面)
    pub video_output_allow_iyuv: bool,
    /// 允许输出 BGRA8
    pub video_output_allow_bgra8: bool,
    /// 允许输出 NV12
    pub video_output_allow_nv12: bool,
    /// 连续被解码器拒绝的数据包上限, 超过后该流按失败处理
    pub skip_errors: u32,
    /// 视频解码线程上限, 0 表示使用全部硬件线程
    pub max_video_threads: u32,
    /// 音频解码线程上限, 0 表示使用全部硬件线程
    pub max_audio_threads: u32,
    /// 会话 I/O 缓冲区大小 (字节)
    pub stream_buffer_size: usize,
    /// 转交给解复用器的容器选项 (按顺序应用)
    pub format_options: Vec<(String, String)>,
    /// 截图模式: 不解码音频, 视频只用片级线程
    pub is_frame_grabber: bool,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            video_output_allow_iyuv: true,
            video_output_allow_bgra8: false,
            video_output_allow_nv12: true,
            skip_errors: 50,
            max_video_threads: 0,
            max_audio_threads: 2,
            stream_buffer_size: 16384,
            format_options: Vec::new(),
            is_frame_grabber: false,
        }
    }
}

impl InteropConfig {
    /// 视频输出像素格式: NV12 > IYUV > BGRA, 全部关闭时仍用 NV12
    pub fn video_output_format(&self) -> PixelFormat {
        if self.video_output_allow_nv12 {
            PixelFormat::Nv12
        } else if self.video_output_allow_iyuv {
            PixelFormat::Yuv420p
        } else if self.video_output_allow_bgra8 {
            PixelFormat::Bgra
        } else {
            PixelFormat::Nv12
        }
    }

    /// 视频解码线程数
    pub fn video_thread_count(&self) -> u32 {
        thread_count(self.max_video_threads)
    }

    /// 音频解码线程数
    pub fn audio_thread_count(&self) -> u32 {
        thread_count(self.max_audio_threads)
    }

    /// 视频解码线程模式
    pub fn video_thread_type(&self) -> ThreadType {
        if self.is_frame_grabber {
            ThreadType::SLICE
        } else {
            ThreadType::FRAME | ThreadType::SLICE
        }
    }
}

/// 按上限计算线程数: 0 表示不限, 否则取硬件线程数与上限的较小值
fn thread_count(cap: u32) -> u32 {
    let hw = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    if cap == 0 { hw } else { hw.min(cap) }
}
