//! 未压缩视频样本提供者.
//!
//! 与解码器协商输出像素格式, 每帧通过 [`ScaleContext`] 转换到
//! NV12 / IYUV / BGRA 之一, 写入一个可复用的目标缓冲区.

use bytes::Bytes;
use log::debug;
use violet_codec::{CodecParameters, CodecParamsType, Frame, VideoCodecParams};
use violet_core::color::ChromaLocation;
use violet_core::{PixelFormat, VioletError, VioletResult};
use violet_format::Stream;
use violet_scale::{ScaleContext, is_conversion_supported};

use super::{ConvertedFrame, FrameConverter, MediaSampleProvider, SampleProvider, frame_ticks};
use crate::config::InteropConfig;
use crate::descriptor::{Aperture, InterlaceMode, NominalRange, StreamDescriptor, VideoDescriptor};
use crate::init::Globals;
use crate::sample::{ChromaSiting, SampleProperties};
use crate::timing::StartOffset;

/// 从解码器提供的候选格式中选择输出格式
///
/// 跳过硬件格式, 取第一个可用格式; 候选中有 NV12 时改用 NV12,
/// 但已选中带 Alpha 的 YUVA420P 时保留.
pub fn select_decoder_format(candidates: &[PixelFormat]) -> Option<PixelFormat> {
    let mut pick = None;
    for &pf in candidates {
        if pf.is_hwaccel() {
            continue;
        }
        if pick.is_none() {
            pick = Some(pf);
        }
        if pf == PixelFormat::Nv12 && pick != Some(PixelFormat::Yuva420p) {
            pick = Some(pf);
        }
    }
    pick
}

/// 色度位置 → 色度采样位置
pub fn chroma_siting(location: ChromaLocation, interlaced: bool) -> Option<ChromaSiting> {
    match location {
        ChromaLocation::Left => Some(ChromaSiting::Mpeg2),
        ChromaLocation::Center => Some(ChromaSiting::Mpeg1),
        ChromaLocation::TopLeft if interlaced => Some(ChromaSiting::DvPal),
        ChromaLocation::TopLeft => Some(ChromaSiting::Cosited),
        _ => None,
    }
}

/// 把缓冲区扩到至少 `size` 字节
fn ensure_buffer(buffer: &mut Vec<u8>, size: usize) -> VioletResult<()> {
    if buffer.len() >= size {
        return Ok(());
    }
    buffer
        .try_reserve_exact(size - buffer.len())
        .map_err(|e| VioletError::ResourceExhausted(format!("无法分配 {} 字节视频缓冲区: {}", size, e)))?;
    buffer.resize(size, 0);
    Ok(())
}

/// 视频帧转换器
pub struct VideoConverter {
    output_format: PixelFormat,
    width: u32,
    height: u32,
    scale: Option<ScaleContext>,
    /// 可复用的目标缓冲区
    buffer: Vec<u8>,
}

impl VideoConverter {
    /// 按解码输出尺寸创建转换器并分配目标缓冲区
    pub fn new(output_format: PixelFormat, width: u32, height: u32) -> VioletResult<Self> {
        let size = output_format.frame_size(width, height).ok_or_else(|| {
            VioletError::InvalidArgument(format!(
                "无法计算 {}x{} {} 帧大小",
                width, height, output_format
            ))
        })?;
        let mut buffer = Vec::new();
        ensure_buffer(&mut buffer, size)?;
        Ok(Self {
            output_format,
            width,
            height,
            scale: None,
            buffer,
        })
    }

    /// 输出像素格式
    pub fn output_format(&self) -> PixelFormat {
        self.output_format
    }

    /// 输出尺寸
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameConverter for VideoConverter {
    fn convert(&mut self, frame: Frame) -> VioletResult<ConvertedFrame> {
        let Frame::Video(vf) = frame else {
            return Err(VioletError::DecodeFailed("视频流收到非视频帧".into()));
        };

        let stale = match &self.scale {
            Some(s) => s.src_format != vf.pixel_format || s.width != vf.width || s.height != vf.height,
            None => true,
        };
        if stale {
            self.scale = Some(ScaleContext::new(
                vf.width,
                vf.height,
                vf.pixel_format,
                self.output_format,
            )?);
        }
        let Some(scale) = self.scale.as_ref() else {
            return Err(VioletError::Internal("转换上下文缺失".into()));
        };

        let size = scale.output_size();
        ensure_buffer(&mut self.buffer, size)?;
        let planes: Vec<&[u8]> = vf.data.iter().map(Vec::as_slice).collect();
        scale.convert(&planes, &vf.linesize, &mut self.buffer[..size])?;

        let mut properties = SampleProperties {
            interlaced: Some(vf.interlaced),
            chroma_siting: chroma_siting(vf.chroma_location, vf.interlaced),
            ..Default::default()
        };
        if vf.interlaced {
            properties.bottom_field_first = Some(!vf.top_field_first);
            properties.repeat_first_field = Some(false);
        }

        Ok(ConvertedFrame {
            data: Bytes::copy_from_slice(&self.buffer[..size]),
            pts_ticks: frame_ticks(vf.pts, vf.time_base),
            properties,
        })
    }
}

/// 为视频流打开解码器并创建样本提供者
pub fn open_video_provider(
    stream: &Stream,
    globals: &Globals,
    config: &InteropConfig,
    start_offset: StartOffset,
) -> VioletResult<Box<dyn SampleProvider>> {
    let params = stream
        .video()
        .ok_or_else(|| VioletError::OpenFailed(format!("流 {} 缺少视频参数", stream.index)))?;

    let mut decoder = globals.codecs.create_decoder(stream.codec_id).map_err(|e| {
        VioletError::OpenFailed(format!("创建 {} 解码器失败: {}", stream.codec_id, e))
    })?;

    let codec_params = CodecParameters {
        codec_id: stream.codec_id,
        extra_data: stream.extra_data.clone(),
        bit_rate: params.bit_rate,
        thread_count: config.video_thread_count(),
        thread_type: config.video_thread_type(),
        params: CodecParamsType::Video(VideoCodecParams {
            width: params.width,
            height: params.height,
            pixel_format: params.pixel_format,
            frame_rate: params.frame_rate,
            sample_aspect_ratio: params.sample_aspect_ratio,
        }),
    };
    {
        let _lock = globals.lock();
        decoder
            .open(&codec_params)
            .map_err(|e| VioletError::OpenFailed(format!("打开 {} 解码器失败: {}", decoder.name(), e)))?;
    }

    let candidates = decoder.pixel_format_candidates();
    let decoder_format = if candidates.is_empty() {
        params.pixel_format
    } else {
        let pf = select_decoder_format(&candidates).ok_or_else(|| {
            VioletError::OpenFailed(format!("{} 只提供硬件像素格式", decoder.name()))
        })?;
        decoder
            .select_pixel_format(pf)
            .map_err(|e| VioletError::OpenFailed(format!("选择像素格式 {} 失败: {}", pf, e)))?;
        pf
    };

    let (width, height) = decoder
        .output_dimensions()
        .unwrap_or((params.width, params.height));
    if width == 0 || height == 0 {
        return Err(VioletError::OpenFailed(format!(
            "解码输出尺寸无效: {}x{}",
            width, height
        )));
    }

    let output_format = config.video_output_format();
    if !is_conversion_supported(decoder_format, output_format) {
        return Err(VioletError::OpenFailed(format!(
            "不支持的像素格式转换: {} → {}",
            decoder_format, output_format
        )));
    }
    let converter = VideoConverter::new(output_format, width, height)?;

    let aperture = ((width, height) != (params.width, params.height)
        && params.width > 0
        && params.height > 0)
        .then_some(Aperture {
            x: 0,
            y: 0,
            width: params.width,
            height: params.height,
        });
    let frame_rate = if params.frame_rate.is_positive() {
        params.frame_rate
    } else {
        params.avg_frame_rate
    };
    let descriptor = VideoDescriptor {
        stream_index: stream.index,
        codec_name: decoder.name().to_string(),
        name: stream.metadata_value("title").map(str::to_string),
        language: stream.metadata_value("language").map(str::to_string),
        subtype: output_format,
        width,
        height,
        frame_rate,
        bit_rate: params.bit_rate,
        pixel_aspect_ratio: params
            .sample_aspect_ratio
            .is_positive()
            .then_some(params.sample_aspect_ratio),
        rotation: stream
            .metadata_value("rotate")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|deg| deg.rem_euclid(360) as u32),
        aperture,
        nominal_range: decoder_format
            .is_full_range()
            .then_some(NominalRange::Full0To255),
        interlace_mode: InterlaceMode::MixedInterlaceOrProgressive,
    };

    debug!(
        "打开视频流 {}: {} {}x{} {} → {}",
        stream.index, descriptor.codec_name, width, height, decoder_format, output_format
    );
    Ok(Box::new(MediaSampleProvider::new(
        stream,
        StreamDescriptor::Video(descriptor),
        decoder,
        converter,
        start_offset,
        config.skip_errors,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use violet_codec::{CodecId, CodecRegistry, Decoder, Packet, VideoFrame};
    use violet_core::Rational;
    use violet_format::FormatRegistry;
    use violet_format::stream::{StreamParams, VideoStreamParams};

    use crate::init::{DefaultLockManager, LockManager, ensure_initialized};
    use crate::provider::tests::{ScriptPump, packet};

    #[test]
    fn test_像素格式选择() {
        use PixelFormat::{Cuda, D3d11, Nv12, Vaapi, Yuv420p, Yuv422p, Yuva420p};
        assert_eq!(select_decoder_format(&[Cuda, Yuv420p, Nv12]), Some(Nv12));
        assert_eq!(select_decoder_format(&[Yuva420p, Nv12]), Some(Yuva420p));
        assert_eq!(select_decoder_format(&[D3d11, Yuv422p]), Some(Yuv422p));
        assert_eq!(select_decoder_format(&[Vaapi, Cuda]), Option::None);
        assert_eq!(select_decoder_format(&[]), Option::None);
    }

    #[test]
    fn test_色度采样位置() {
        assert_eq!(chroma_siting(ChromaLocation::Left, false), Some(ChromaSiting::Mpeg2));
        assert_eq!(chroma_siting(ChromaLocation::Center, true), Some(ChromaSiting::Mpeg1));
        assert_eq!(chroma_siting(ChromaLocation::TopLeft, true), Some(ChromaSiting::DvPal));
        assert_eq!(chroma_siting(ChromaLocation::TopLeft, false), Some(ChromaSiting::Cosited));
        assert_eq!(chroma_siting(ChromaLocation::Bottom, false), None);
        assert_eq!(chroma_siting(ChromaLocation::Unspecified, false), None);
    }

    #[test]
    fn test_隔行帧属性() {
        let mut conv = VideoConverter::new(PixelFormat::Nv12, 2, 2).unwrap();
        let mut vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        vf.data[0] = vec![16, 32, 48, 64];
        vf.linesize[0] = 2;
        vf.interlaced = true;
        vf.top_field_first = true;
        vf.chroma_location = ChromaLocation::TopLeft;
        vf.pts = 3;
        vf.time_base = Rational::new(1, 10);

        let out = conv.convert(Frame::Video(vf)).unwrap();
        assert_eq!(out.data.as_ref(), &[16, 32, 48, 64, 128, 128]);
        assert_eq!(out.pts_ticks, Some(3_000_000));
        assert_eq!(out.properties.interlaced, Some(true));
        assert_eq!(out.properties.bottom_field_first, Some(false));
        assert_eq!(out.properties.repeat_first_field, Some(false));
        assert_eq!(out.properties.chroma_siting, Some(ChromaSiting::DvPal));
    }

    #[test]
    fn test_逐行帧属性() {
        let mut conv = VideoConverter::new(PixelFormat::Yuv420p, 2, 2).unwrap();
        let mut vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        vf.data[0] = vec![0; 4];
        vf.linesize[0] = 2;
        let out = conv.convert(Frame::Video(vf)).unwrap();
        assert_eq!(out.data.len(), 6);
        assert_eq!(out.pts_ticks, None);
        assert_eq!(out.properties.interlaced, Some(false));
        assert_eq!(out.properties.bottom_field_first, None);
        assert_eq!(out.properties.chroma_siting, None);
    }

    #[test]
    fn test_转换失败() {
        let mut conv = VideoConverter::new(PixelFormat::Nv12, 2, 2).unwrap();
        let mut vf = VideoFrame::new(2, 2, PixelFormat::Gray8);
        vf.data[0] = vec![0; 2];
        vf.linesize[0] = 2;
        assert!(conv.convert(Frame::Video(vf)).is_err());
    }

    fn gray_stream(width: u32, height: u32) -> Stream {
        let mut stream = Stream::new(
            0,
            CodecId::RawVideo,
            Rational::new(1, 10),
            StreamParams::Video(VideoStreamParams {
                width,
                height,
                pixel_format: PixelFormat::Gray8,
                frame_rate: Rational::UNDEFINED,
                avg_frame_rate: Rational::new(10, 1),
                sample_aspect_ratio: Rational::new(0, 1),
                bit_rate: 6400,
            }),
        );
        stream.metadata.push(("title".into(), "主画面".into()));
        stream.metadata.push(("rotate".into(), "-90".into()));
        stream
    }

    #[test]
    fn test_打开视频提供者() {
        let globals = ensure_initialized();
        let config = InteropConfig {
            video_output_allow_nv12: false,
            ..Default::default()
        };
        let stream = gray_stream(4, 2);
        let mut provider =
            open_video_provider(&stream, globals, &config, StartOffset::ZERO).unwrap();

        let StreamDescriptor::Video(desc) = provider.descriptor().clone() else {
            panic!("应为视频描述符");
        };
        assert_eq!(desc.subtype, PixelFormat::Yuv420p);
        assert_eq!((desc.width, desc.height), (4, 2));
        assert_eq!(desc.frame_rate, Rational::new(10, 1));
        assert_eq!(desc.codec_name, "rawvideo");
        assert_eq!(desc.name.as_deref(), Some("主画面"));
        assert_eq!(desc.rotation, Some(270));
        assert_eq!(desc.pixel_aspect_ratio, None);
        assert_eq!(desc.aperture, None);
        assert_eq!(desc.nominal_range, None);

        let mut pkt = packet(50, 2, 1);
        pkt.data = Bytes::from(vec![50u8; 8]);
        let mut pump = ScriptPump::new(vec![pkt]);
        let sample = provider.get_next_sample(&mut pump).unwrap();
        assert_eq!(sample.timestamp, 2_000_000);
        assert_eq!(sample.duration, 1_000_000);
        assert_eq!(sample.data.len(), 8 + 2 + 2);
        assert_eq!(&sample.data[..8], &[50u8; 8]);
    }

    #[test]
    fn test_不支持的编码打开失败() {
        let globals = ensure_initialized();
        let mut stream = gray_stream(4, 2);
        stream.codec_id = CodecId::H264;
        assert!(matches!(
            open_video_provider(&stream, globals, &InteropConfig::default(), StartOffset::ZERO),
            Err(VioletError::OpenFailed(_))
        ));
    }

    /// 按宏块对齐输出 16x16 Gray8 帧的解码器, 像素值取包的首字节
    struct PaddedDecoder {
        pending: Option<Frame>,
    }

    impl PaddedDecoder {
        fn create() -> VioletResult<Box<dyn Decoder>> {
            Ok(Box::new(Self { pending: None }))
        }
    }

    impl Decoder for PaddedDecoder {
        fn codec_id(&self) -> CodecId {
            CodecId::H264
        }

        fn name(&self) -> &str {
            "padded"
        }

        fn send_packet(&mut self, packet: &Packet) -> VioletResult<()> {
            let mut vf = VideoFrame::new(16, 16, PixelFormat::Gray8);
            vf.data[0] = vec![packet.data.first().copied().unwrap_or(0); 256];
            vf.linesize[0] = 16;
            self.pending = Some(Frame::Video(vf));
            Ok(())
        }

        fn receive_frame(&mut self) -> VioletResult<Frame> {
            self.pending.take().ok_or(VioletError::NeedMoreData)
        }

        fn flush(&mut self) {
            self.pending = None;
        }

        fn output_dimensions(&self) -> Option<(u32, u32)> {
            Some((16, 16))
        }
    }

    #[test]
    fn test_解码尺寸大于显示尺寸时给出显示区域() {
        let mut codecs = CodecRegistry::new();
        codecs.register_decoder(CodecId::H264, "padded", PaddedDecoder::create);
        let globals = Globals::new(codecs, FormatRegistry::new(), DefaultLockManager.create_lock());
        let mut stream = gray_stream(8, 6);
        stream.codec_id = CodecId::H264;

        let mut provider =
            open_video_provider(&stream, &globals, &InteropConfig::default(), StartOffset::ZERO)
                .unwrap();
        let StreamDescriptor::Video(desc) = provider.descriptor().clone() else {
            panic!("应为视频描述符");
        };
        assert_eq!((desc.width, desc.height), (16, 16));
        assert_eq!(
            desc.aperture,
            Some(Aperture {
                x: 0,
                y: 0,
                width: 8,
                height: 6,
            })
        );
        assert_eq!(desc.subtype, PixelFormat::Nv12);

        // 缓冲区按解码尺寸分配
        let mut pump = ScriptPump::new(vec![packet(7, 0, 1)]);
        let sample = provider.get_next_sample(&mut pump).unwrap();
        assert_eq!(sample.data.len(), 16 * 16 * 3 / 2);
        assert_eq!(sample.data[0], 7);
        assert_eq!(sample.data[16 * 16], 128);
    }
}
