//! PCM 音频解码器.
//!
//! 将未压缩的 PCM 数据从 Packet 转换为交错格式的 AudioFrame.
//! 六种 PCM 变体共用一套解码逻辑, 差异由格式描述表给出.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::debug;
use violet_core::{ChannelLayout, SampleFormat, VioletError, VioletResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{AudioFrame, Frame};
use crate::packet::Packet;

/// PCM 格式描述
struct PcmFormatDesc {
    /// 编解码器 ID
    codec_id: CodecId,
    /// 码流中每个样本的字节数
    bytes_per_sample: u32,
    /// 输出的采样格式
    output_format: SampleFormat,
    /// 将码流字节转换为输出格式字节
    decode_fn: fn(&[u8], &mut Vec<u8>),
}

fn decode_copy(src: &[u8], dst: &mut Vec<u8>) {
    dst.extend_from_slice(src);
}

/// S16 大端转本地小端
fn decode_s16be(src: &[u8], dst: &mut Vec<u8>) {
    let mut buf = [0u8; 2];
    for chunk in src.chunks_exact(2) {
        LittleEndian::write_i16(&mut buf, BigEndian::read_i16(chunk));
        dst.extend_from_slice(&buf);
    }
}

/// S24LE 符号扩展到 S32 (高位对齐, 与 S32 满幅一致)
fn decode_s24le(src: &[u8], dst: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    for chunk in src.chunks_exact(3) {
        let value = LittleEndian::read_i24(chunk);
        LittleEndian::write_i32(&mut buf, value << 8);
        dst.extend_from_slice(&buf);
    }
}

fn pcm_format_desc(codec_id: CodecId) -> Option<PcmFormatDesc> {
    let (bytes_per_sample, output_format, decode_fn): (u32, SampleFormat, fn(&[u8], &mut Vec<u8>)) =
        match codec_id {
            CodecId::PcmU8 => (1, SampleFormat::U8, decode_copy),
            CodecId::PcmS16le => (2, SampleFormat::S16, decode_copy),
            CodecId::PcmS16be => (2, SampleFormat::S16, decode_s16be),
            CodecId::PcmS24le => (3, SampleFormat::S32, decode_s24le),
            CodecId::PcmS32le => (4, SampleFormat::S32, decode_copy),
            CodecId::PcmF32le => (4, SampleFormat::F32, decode_copy),
            _ => return None,
        };
    Some(PcmFormatDesc {
        codec_id,
        bytes_per_sample,
        output_format,
        decode_fn,
    })
}

/// PCM 音频解码器
pub struct PcmDecoder {
    /// 格式描述
    desc: PcmFormatDesc,
    /// 采样率
    sample_rate: u32,
    /// 声道布局
    channel_layout: ChannelLayout,
    /// 每个样本块的字节数 (每样本字节数 * 声道数)
    block_align: u32,
    /// 已解码帧缓冲
    output_frame: Option<Frame>,
    /// 是否已打开
    opened: bool,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl PcmDecoder {
    fn create(codec_id: CodecId) -> VioletResult<Box<dyn Decoder>> {
        let desc = pcm_format_desc(codec_id).ok_or_else(|| {
            VioletError::CodecNotFound(format!("不支持的 PCM 格式: {}", codec_id))
        })?;
        Ok(Box::new(Self {
            desc,
            sample_rate: 0,
            channel_layout: ChannelLayout::MONO,
            block_align: 0,
            output_frame: None,
            opened: false,
            flushing: false,
        }))
    }

    pub fn new_u8() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmU8)
    }

    pub fn new_s16le() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16le)
    }

    pub fn new_s16be() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS16be)
    }

    pub fn new_s24le() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS24le)
    }

    pub fn new_s32le() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmS32le)
    }

    pub fn new_f32le() -> VioletResult<Box<dyn Decoder>> {
        Self::create(CodecId::PcmF32le)
    }
}

impl Decoder for PcmDecoder {
    fn codec_id(&self) -> CodecId {
        self.desc.codec_id
    }

    fn name(&self) -> &str {
        self.desc.codec_id.name()
    }

    fn open(&mut self, params: &CodecParameters) -> VioletResult<()> {
        let audio = match &params.params {
            CodecParamsType::Audio(a) => a,
            _ => {
                return Err(VioletError::InvalidArgument(
                    "PCM 解码器需要音频参数".into(),
                ));
            }
        };

        if audio.sample_rate == 0 {
            return Err(VioletError::InvalidArgument("采样率不能为 0".into()));
        }
        if audio.channel_layout.channels == 0 {
            return Err(VioletError::InvalidArgument("声道数不能为 0".into()));
        }

        self.sample_rate = audio.sample_rate;
        self.channel_layout = audio.channel_layout;
        self.block_align = self.desc.bytes_per_sample * audio.channel_layout.channels;
        self.output_frame = None;
        self.opened = true;
        self.flushing = false;

        debug!(
            "打开 {} 解码器: {} Hz, {} 声道, 输出格式={}, 线程={} ({:?})",
            self.name(),
            self.sample_rate,
            self.channel_layout.channels,
            self.desc.output_format,
            params.thread_count,
            params.thread_type,
        );
        // PCM 输出本身是交错的, 请求的交错格式若不同则按原格式输出
        if audio.requested_sample_format != SampleFormat::None
            && audio.requested_sample_format != self.desc.output_format
        {
            debug!(
                "{} 不转换到请求格式 {}, 保持 {}",
                self.name(),
                audio.requested_sample_format,
                self.desc.output_format
            );
        }
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> VioletResult<()> {
        if !self.opened {
            return Err(VioletError::Codec("解码器未打开, 请先调用 open()".into()));
        }
        if self.output_frame.is_some() {
            return Err(VioletError::NeedMoreData);
        }

        // 空包 = flush
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }

        let data_len = packet.data.len() as u32;
        if data_len % self.block_align != 0 {
            return Err(VioletError::InvalidData(format!(
                "数据大小 {} 不是 block_align {} 的整数倍",
                data_len, self.block_align,
            )));
        }

        let nb_samples = data_len / self.block_align;
        let mut frame = AudioFrame::new(
            nb_samples,
            self.sample_rate,
            self.desc.output_format,
            self.channel_layout,
        );
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;

        let output_size = nb_samples as usize
            * self.channel_layout.channels as usize
            * self.desc.output_format.bytes_per_sample() as usize;
        let mut decoded = Vec::with_capacity(output_size);
        (self.desc.decode_fn)(&packet.data, &mut decoded);
        frame.data[0] = decoded;

        self.output_frame = Some(Frame::Audio(frame));
        Ok(())
    }

    fn receive_frame(&mut self) -> VioletResult<Frame> {
        if let Some(frame) = self.output_frame.take() {
            return Ok(frame);
        }
        if self.flushing {
            return Err(VioletError::Eof);
        }
        Err(VioletError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.output_frame = None;
        self.flushing = false;
    }
}
