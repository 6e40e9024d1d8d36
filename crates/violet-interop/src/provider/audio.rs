//! 未压缩音频样本提供者.
//!
//! 所有采样格式统一转换为交错的有符号 16 位, 保持原采样率与声道数.

use bytes::Bytes;
use log::debug;
use violet_codec::{AudioCodecParams, CodecParameters, CodecParamsType, Frame, ThreadType};
use violet_core::{SampleFormat, VioletError, VioletResult};
use violet_format::Stream;
use violet_resample::ResampleContext;

use super::{ConvertedFrame, FrameConverter, MediaSampleProvider, SampleProvider, frame_ticks};
use crate::config::InteropConfig;
use crate::descriptor::{AudioDescriptor, StreamDescriptor};
use crate::init::Globals;
use crate::sample::SampleProperties;
use crate::timing::StartOffset;

/// 输出采样格式
pub const OUTPUT_SAMPLE_FORMAT: SampleFormat = SampleFormat::S16;

/// 输出位深
pub const OUTPUT_BITS_PER_SAMPLE: u32 = 16;

/// 平面格式请求解码器改为输出对应的交错格式
pub fn requested_sample_format(format: SampleFormat) -> SampleFormat {
    match format {
        SampleFormat::S16p => SampleFormat::S16,
        SampleFormat::S32p => SampleFormat::S32,
        SampleFormat::F32p => SampleFormat::F32,
        _ => SampleFormat::None,
    }
}

/// 音频帧转换器
#[derive(Default)]
pub struct AudioConverter {
    resample: Option<ResampleContext>,
}

impl AudioConverter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameConverter for AudioConverter {
    fn convert(&mut self, frame: Frame) -> VioletResult<ConvertedFrame> {
        let Frame::Audio(af) = frame else {
            return Err(VioletError::DecodeFailed("音频流收到非音频帧".into()));
        };
        let channels = af.channel_layout.channels;

        let stale = match &self.resample {
            Some(ctx) => ctx.src_format != af.sample_format || ctx.channels != channels,
            None => true,
        };
        if stale {
            self.resample = Some(ResampleContext::new(
                af.sample_format,
                channels,
                OUTPUT_SAMPLE_FORMAT,
            )?);
        }
        let Some(ctx) = self.resample.as_ref() else {
            return Err(VioletError::Internal("采样转换上下文缺失".into()));
        };

        let planes: Vec<&[u8]> = af.data.iter().map(Vec::as_slice).collect();
        let data = ctx.convert(&planes, af.nb_samples)?;
        Ok(ConvertedFrame {
            data: Bytes::from(data),
            pts_ticks: frame_ticks(af.pts, af.time_base),
            properties: SampleProperties::default(),
        })
    }
}

/// 为音频流打开解码器并创建样本提供者
pub fn open_audio_provider(
    stream: &Stream,
    globals: &Globals,
    config: &InteropConfig,
    start_offset: StartOffset,
) -> VioletResult<Box<dyn SampleProvider>> {
    let params = stream
        .audio()
        .ok_or_else(|| VioletError::OpenFailed(format!("流 {} 缺少音频参数", stream.index)))?;

    let mut decoder = globals.codecs.create_decoder(stream.codec_id).map_err(|e| {
        VioletError::OpenFailed(format!("创建 {} 解码器失败: {}", stream.codec_id, e))
    })?;

    let codec_params = CodecParameters {
        codec_id: stream.codec_id,
        extra_data: stream.extra_data.clone(),
        bit_rate: params.bit_rate,
        thread_count: config.audio_thread_count(),
        thread_type: ThreadType::FRAME | ThreadType::SLICE,
        params: CodecParamsType::Audio(AudioCodecParams {
            sample_rate: params.sample_rate,
            channel_layout: params.channel_layout,
            sample_format: params.sample_format,
            requested_sample_format: requested_sample_format(params.sample_format),
            frame_size: params.frame_size,
        }),
    };
    {
        let _lock = globals.lock();
        decoder
            .open(&codec_params)
            .map_err(|e| VioletError::OpenFailed(format!("打开 {} 解码器失败: {}", decoder.name(), e)))?;
    }

    let descriptor = AudioDescriptor {
        stream_index: stream.index,
        codec_name: decoder.name().to_string(),
        name: stream.metadata_value("title").map(str::to_string),
        language: stream.metadata_value("language").map(str::to_string),
        sample_rate: params.sample_rate,
        channels: params.channel_layout.channels,
        bits_per_sample: OUTPUT_BITS_PER_SAMPLE,
        bit_rate: params.bit_rate,
    };

    debug!(
        "打开音频流 {}: {} {} Hz × {} 声道",
        stream.index, descriptor.codec_name, descriptor.sample_rate, descriptor.channels
    );
    Ok(Box::new(MediaSampleProvider::new(
        stream,
        StreamDescriptor::Audio(descriptor),
        decoder,
        AudioConverter::new(),
        start_offset,
        config.skip_errors,
    )))
}
