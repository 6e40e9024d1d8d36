//! # Violet
//!
//! 纯 Rust 实现的拉取式解复用/解码样本源.
//!
//! 打开一个媒体文件或调用方提供的字节流, 识别容器, 为第一条视频流与第一条音频流
//! 建立解码器, 然后按需逐个取出未压缩样本:
//! - **视频**: 转换为 IYUV (I420), 带宽高比、色彩范围、隔行与色度位置等属性
//! - **音频**: 转换为交错 16 位 PCM, 保持原采样率与声道数
//! - **时间戳**: 统一为 100 ns 刻度并减去流起始偏移
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use violet::core::MediaType;
//! use violet::{InteropConfig, MediaSession};
//!
//! let session = MediaSession::open_file("movie.avi", &InteropConfig::default()).unwrap();
//! for desc in session.descriptors() {
//!     println!("流 {}: {:?}", desc.stream_index(), desc.media_type());
//! }
//! if let Some(sample) = session.get_next_sample(MediaType::Audio) {
//!     println!("首个音频样本 {} 字节", sample.data.len());
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `violet-core` | 核心类型: 有理数、时间戳、像素/采样格式、错误 |
//! | `violet-codec` | 解码器框架与内置解码器 |
//! | `violet-format` | 容器探测、解封装与 I/O |
//! | `violet-scale` | 像素格式转换 |
//! | `violet-resample` | 采样格式转换 |
//! | `violet-interop` | 读取器、样本提供者与会话 |

/// 核心类型与工具
pub use violet_core as core;

/// 解码器框架
pub use violet_codec as codec;

/// 容器格式框架
pub use violet_format as format;

/// 像素格式转换
pub use violet_scale as scale;

/// 采样格式转换
pub use violet_resample as resample;

/// 拉取式样本管线
pub use violet_interop as interop;

pub mod logging;

pub use violet_interop::{InteropConfig, MediaSample, MediaSession, StreamDescriptor};

/// 获取 Violet 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_版本号非空() {
        assert!(!version().is_empty());
    }
}
