//! # violet-codec
//!
//! Violet 解码器框架, 提供 Packet/Frame 抽象、解码器契约与注册表.
//!
//! 管线把解码器视为不透明组件: 送入一个压缩包, 取出零或一帧.
//! 内置的 RawVideo 与 PCM 解码器让整条管线无需外部库即可端到端运行.
//!
//! ## 使用示例
//!
//! ```rust
//! use violet_codec::{CodecRegistry, CodecId};
//!
//! let mut reg = CodecRegistry::new();
//! violet_codec::register_all(&mut reg);
//!
//! let decoder = reg.create_decoder(CodecId::PcmS16le).unwrap();
//! assert_eq!(decoder.name(), "pcm_s16le");
//! ```

pub mod codec_id;
pub mod codec_parameters;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use codec_parameters::{
    AudioCodecParams, CodecParameters, CodecParamsType, ThreadType, VideoCodecParams,
};
pub use decoder::Decoder;
pub use frame::{AudioFrame, Frame, VideoFrame};
pub use packet::Packet;
pub use registry::CodecRegistry;

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
