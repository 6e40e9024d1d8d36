//! # violet-core
//!
//! Violet 核心库, 提供基础类型定义、错误处理和时间换算.
//!
//! 其余 crate (解码、解复用、像素/采样转换、样本管线) 都建立在这些类型之上.

pub mod channel_layout;
pub mod color;
pub mod error;
pub mod media_type;
pub mod pixel_format;
pub mod rational;
pub mod sample_format;
pub mod timestamp;

// 重导出常用类型
pub use channel_layout::ChannelLayout;
pub use error::{VioletError, VioletResult};
pub use media_type::MediaType;
pub use pixel_format::PixelFormat;
pub use rational::Rational;
pub use sample_format::SampleFormat;
pub use timestamp::{NOPTS_VALUE, TICKS_PER_SECOND, Timestamp};
