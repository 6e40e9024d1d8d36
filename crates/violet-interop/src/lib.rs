//! # violet-interop
//!
//! Violet 拉取式样本管线.
//!
//! 一个共享的 [`Reader`](reader::Reader) 从容器读取数据包并分发到各流的队列,
//! 每个活动流由一个 [`SampleProvider`](provider::SampleProvider) 负责
//! 出队、解码、转换并计算时间戳. [`MediaSession`](session::MediaSession)
//! 持有读取器与提供者, 用一把锁串行化取样、定位与关闭.
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use violet_core::MediaType;
//! use violet_interop::{InteropConfig, MediaSession};
//!
//! let session = MediaSession::open_file("movie.avi", &InteropConfig::default()).unwrap();
//! while let Some(sample) = session.get_next_sample(MediaType::Video) {
//!     println!("{} ({} 字节)", sample.timestamp, sample.data.len());
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod init;
pub mod packet_queue;
pub mod provider;
pub mod reader;
pub mod sample;
pub mod session;
pub mod timing;

// 重导出常用类型
pub use config::InteropConfig;
pub use descriptor::{AudioDescriptor, StreamDescriptor, VideoDescriptor};
pub use init::ensure_initialized;
pub use sample::{ChromaSiting, MediaSample, SampleProperties};
pub use session::MediaSession;
