//! 样本提供者.
//!
//! 每个活动流一个提供者: 从自己的队列取包 (队列空时驱动共享读取器),
//! 解码, 交给转换器转成稳定的输出格式, 并计算展示时间戳.
//!
//! 音视频的差异只在 [`FrameConverter`] 中, 公共流程由
//! [`MediaSampleProvider`] 实现.

pub mod audio;
pub mod video;

use bytes::Bytes;
use log::{debug, warn};
use violet_codec::{Decoder, Frame, Packet};
use violet_core::timestamp::to_ticks;
use violet_core::{MediaType, NOPTS_VALUE, Rational, Timestamp, VioletError, VioletResult};
use violet_format::Stream;

use crate::descriptor::StreamDescriptor;
use crate::packet_queue::PacketQueue;
use crate::reader::{PacketPump, PacketSink, ReadOutcome};
use crate::sample::{MediaSample, SampleProperties};
use crate::timing::StartOffset;

pub use audio::{AudioConverter, open_audio_provider};
pub use video::{VideoConverter, open_video_provider};

/// 样本提供者
pub trait SampleProvider: PacketSink + Send {
    /// 媒体类型
    fn media_type(&self) -> MediaType;

    /// 流描述符
    fn descriptor(&self) -> &StreamDescriptor;

    /// 流时间基
    fn time_base(&self) -> Rational;

    /// 产出下一个样本
    ///
    /// 已禁用时返回 `None`. 队列为空时通过 `pump` 驱动读取器,
    /// 到达末尾或出现不可恢复的错误时禁用本流并返回 `None`.
    fn get_next_sample(&mut self, pump: &mut dyn PacketPump) -> Option<MediaSample>;

    /// 丢弃队列中的包, 重置解码器, 标记下一个样本不连续
    fn flush(&mut self);

    /// 启用
    fn enable(&mut self);

    /// 禁用 (先 flush), 之后到达的包被丢弃
    fn disable(&mut self);

    /// 是否启用
    fn is_enabled(&self) -> bool;

    /// 下一个样本是否标记为不连续
    fn is_discontinuous(&self) -> bool;

    /// 队列中等待解码的包数
    fn queued_packets(&self) -> usize;

    /// 作为数据包接收者
    fn as_sink(&mut self) -> &mut dyn PacketSink;
}

/// 转换后的帧
#[derive(Debug, Clone)]
pub struct ConvertedFrame {
    /// 输出数据
    pub data: Bytes,
    /// 解码器给出的帧时间 (刻度, 未扣除起始偏移)
    pub pts_ticks: Option<i64>,
    /// 视频附加属性
    pub properties: SampleProperties,
}

/// 帧转换器: 解码帧 → 输出格式
pub trait FrameConverter: Send {
    /// 转换一帧, 失败时本流按解码错误处理
    fn convert(&mut self, frame: Frame) -> VioletResult<ConvertedFrame>;
}

/// 帧时间换算为刻度, 时间未设置时为 `None`
pub(crate) fn frame_ticks(pts: i64, time_base: Rational) -> Option<i64> {
    Timestamp::new(pts, time_base).to_ticks()
}

/// 通用样本提供者
pub struct MediaSampleProvider<C> {
    media_type: MediaType,
    stream_index: usize,
    time_base: Rational,
    descriptor: StreamDescriptor,
    decoder: Box<dyn Decoder>,
    converter: C,
    queue: PacketQueue,
    start_offset: StartOffset,
    /// 下一个无时间戳包使用的 pts (流时间基)
    next_packet_pts: i64,
    /// 允许连续被解码器拒绝的包数
    skip_errors: u32,
    enabled: bool,
    discontinuous: bool,
}

impl<C: FrameConverter> MediaSampleProvider<C> {
    /// 创建提供者, 解码器必须已打开
    pub fn new(
        stream: &Stream,
        descriptor: StreamDescriptor,
        decoder: Box<dyn Decoder>,
        converter: C,
        start_offset: StartOffset,
        skip_errors: u32,
    ) -> Self {
        Self {
            media_type: stream.media_type,
            stream_index: stream.index,
            time_base: stream.time_base,
            descriptor,
            decoder,
            converter,
            queue: PacketQueue::new(),
            start_offset,
            next_packet_pts: 0,
            skip_errors,
            enabled: true,
            discontinuous: false,
        }
    }

    /// 起始时间偏移
    pub fn start_offset(&self) -> StartOffset {
        self.start_offset
    }

    /// 计算包的 (时间戳, 时长), 单位刻度
    fn packet_timing(&mut self, packet: &Packet) -> (i64, i64) {
        let pts = if packet.pts != NOPTS_VALUE {
            packet.pts
        } else {
            self.next_packet_pts
        };
        self.next_packet_pts = pts.saturating_add(packet.duration);
        let timestamp = to_ticks(pts, self.time_base) - self.start_offset.ticks;
        (timestamp, to_ticks(packet.duration, self.time_base))
    }

    /// 送入一个包并取出零或一帧
    fn decode(&mut self, packet: &Packet) -> VioletResult<Option<Frame>> {
        self.decoder.send_packet(packet)?;
        match self.decoder.receive_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(VioletError::NeedMoreData | VioletError::Eof) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<C: FrameConverter> PacketSink for MediaSampleProvider<C> {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn queue_packet(&mut self, packet: Packet) -> bool {
        if !self.enabled {
            return false;
        }
        self.queue.push(packet);
        true
    }
}

impl<C: FrameConverter + 'static> SampleProvider for MediaSampleProvider<C> {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn get_next_sample(&mut self, pump: &mut dyn PacketPump) -> Option<MediaSample> {
        let mut rejected = 0u32;
        while self.enabled {
            let packet = match self.queue.pop() {
                Some(p) => p,
                None => match pump.pump(self) {
                    ReadOutcome::Queued | ReadOutcome::Dropped => continue,
                    ReadOutcome::Eof => {
                        debug!("流 {} 到达末尾", self.stream_index);
                        self.disable();
                        return None;
                    }
                    ReadOutcome::Failed => {
                        warn!("流 {} 读取失败, 停止输出", self.stream_index);
                        self.disable();
                        return None;
                    }
                },
            };

            let (timestamp, duration) = self.packet_timing(&packet);
            let frame = match self.decode(&packet) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    rejected += 1;
                    if rejected > self.skip_errors {
                        warn!(
                            "流 {} 连续 {} 个包解码失败, 停止输出: {}",
                            self.stream_index, rejected, e
                        );
                        self.disable();
                        return None;
                    }
                    debug!("流 {} 跳过无法解码的包: {}", self.stream_index, e);
                    continue;
                }
            };

            let converted = match self.converter.convert(frame) {
                Ok(c) => c,
                Err(e) => {
                    warn!("流 {} 帧转换失败, 停止输出: {}", self.stream_index, e);
                    self.disable();
                    return None;
                }
            };

            let timestamp = converted
                .pts_ticks
                .map_or(timestamp, |t| t - self.start_offset.ticks);
            let sample = MediaSample {
                data: converted.data,
                timestamp,
                duration,
                discontinuous: self.discontinuous,
                properties: converted.properties,
            };
            self.discontinuous = false;
            return Some(sample);
        }
        None
    }

    fn flush(&mut self) {
        let dropped = self.queue.clear();
        self.decoder.flush();
        self.discontinuous = true;
        if dropped > 0 {
            debug!("流 {} 丢弃 {} 个未解码的包", self.stream_index, dropped);
        }
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.flush();
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_discontinuous(&self) -> bool {
        self.discontinuous
    }

    fn queued_packets(&self) -> usize {
        self.queue.len()
    }

    fn as_sink(&mut self) -> &mut dyn PacketSink {
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use violet_codec::{AudioFrame, CodecId};
    use violet_core::{ChannelLayout, SampleFormat};
    use violet_format::stream::StreamParams;

    use crate::descriptor::AudioDescriptor;
    use crate::timing::StartOffsetPath;

    /// 测试解码器: 首字节 0xFF 拒绝, 0xEE 不出帧, 其余原样输出
    pub(crate) struct EchoDecoder {
        pending: Option<Frame>,
        pub(crate) flushes: usize,
    }

    impl EchoDecoder {
        pub(crate) fn new() -> Self {
            Self {
                pending: None,
                flushes: 0,
            }
        }
    }

    impl Decoder for EchoDecoder {
        fn codec_id(&self) -> CodecId {
            CodecId::PcmU8
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn send_packet(&mut self, packet: &Packet) -> VioletResult<()> {
            match packet.data.first() {
                Some(0xFF) => Err(VioletError::InvalidData("拒绝".into())),
                Some(0xEE) => Ok(()),
                _ => {
                    let mut frame = AudioFrame::new(
                        packet.data.len() as u32,
                        8000,
                        SampleFormat::U8,
                        ChannelLayout::from_channels(1),
                    );
                    frame.data[0] = packet.data.to_vec();
                    self.pending = Some(Frame::Audio(frame));
                    Ok(())
                }
            }
        }

        fn receive_frame(&mut self) -> VioletResult<Frame> {
            self.pending.take().ok_or(VioletError::NeedMoreData)
        }

        fn flush(&mut self) {
            self.pending = None;
            self.flushes += 1;
        }
    }

    /// 原样输出第一个平面, 不给帧时间
    pub(crate) struct PassConverter;

    impl FrameConverter for PassConverter {
        fn convert(&mut self, frame: Frame) -> VioletResult<ConvertedFrame> {
            match frame {
                Frame::Audio(af) => Ok(ConvertedFrame {
                    data: Bytes::from(af.data[0].clone()),
                    pts_ticks: None,
                    properties: SampleProperties::default(),
                }),
                Frame::Video(_) => Err(VioletError::DecodeFailed("非音频帧".into())),
            }
        }
    }

    /// 按顺序投递预置数据包
    pub(crate) struct ScriptPump {
        pub(crate) packets: VecDeque<Packet>,
        pub(crate) fail: bool,
    }

    impl ScriptPump {
        pub(crate) fn new(packets: Vec<Packet>) -> Self {
            Self {
                packets: packets.into(),
                fail: false,
            }
        }
    }

    impl PacketPump for ScriptPump {
        fn pump(&mut self, requester: &mut dyn PacketSink) -> ReadOutcome {
            if self.fail {
                return ReadOutcome::Failed;
            }
            match self.packets.pop_front() {
                Some(p) if p.stream_index == requester.stream_index() => {
                    if requester.queue_packet(p) {
                        ReadOutcome::Queued
                    } else {
                        ReadOutcome::Dropped
                    }
                }
                Some(_) => ReadOutcome::Dropped,
                None => ReadOutcome::Eof,
            }
        }
    }

    pub(crate) fn packet(first_byte: u8, pts: i64, duration: i64) -> Packet {
        let mut p = Packet::from_data(vec![first_byte, 1, 2]);
        p.pts = pts;
        p.duration = duration;
        p
    }

    fn provider(tb: Rational, offset: StartOffset, skip: u32) -> MediaSampleProvider<PassConverter> {
        let stream = Stream::new(0, CodecId::PcmU8, tb, StreamParams::Other);
        let descriptor = StreamDescriptor::Audio(AudioDescriptor {
            stream_index: 0,
            codec_name: "echo".into(),
            name: None,
            language: None,
            sample_rate: 8000,
            channels: 1,
            bits_per_sample: 16,
            bit_rate: 0,
        });
        MediaSampleProvider::new(
            &stream,
            descriptor,
            Box::new(EchoDecoder::new()),
            PassConverter,
            offset,
            skip,
        )
    }

    #[test]
    fn test_显式与隐式时间戳() {
        let mut p = provider(Rational::new(1, 25), StartOffset::ZERO, 50);
        let mut pump = ScriptPump::new(vec![
            packet(1, 0, 1),
            packet(2, NOPTS_VALUE, 1),
            packet(3, 10, 2),
            packet(4, NOPTS_VALUE, 2),
        ]);
        let ts: Vec<(i64, i64)> = std::iter::from_fn(|| p.get_next_sample(&mut pump))
            .map(|s| (s.timestamp, s.duration))
            .collect();
        assert_eq!(
            ts,
            vec![
                (0, 400_000),
                (400_000, 400_000),
                (4_000_000, 800_000),
                (4_800_000, 800_000),
            ]
        );
        // 末尾后禁用
        assert!(!p.is_enabled());
        assert!(p.get_next_sample(&mut pump).is_none());
    }

    #[test]
    fn test_起始偏移() {
        let offset = StartOffset {
            ticks: 10_000_000,
            path: StartOffsetPath::Coarse,
        };
        let mut p = provider(Rational::new(1, 1000), offset, 50);
        let mut pump = ScriptPump::new(vec![packet(1, 1000, 40), packet(1, 1040, 40)]);
        assert_eq!(p.get_next_sample(&mut pump).map(|s| s.timestamp), Some(0));
        assert_eq!(p.get_next_sample(&mut pump).map(|s| s.timestamp), Some(400_000));
        assert_eq!(p.start_offset(), offset);
    }

    #[test]
    fn test_flush_后仅一个不连续样本() {
        let mut p = provider(Rational::new(1, 10), StartOffset::ZERO, 50);
        p.queue_packet(packet(1, 0, 1));
        p.queue_packet(packet(1, 1, 1));
        p.flush();
        p.flush();
        assert_eq!(p.queued_packets(), 0);
        assert!(p.is_discontinuous());

        let mut pump = ScriptPump::new(vec![packet(1, 5, 1), packet(1, 6, 1)]);
        let first = p.get_next_sample(&mut pump).unwrap();
        assert!(first.discontinuous);
        assert_eq!(first.timestamp, 5_000_000);
        let second = p.get_next_sample(&mut pump).unwrap();
        assert!(!second.discontinuous);
    }

    #[test]
    fn test_禁用后丢弃数据包() {
        let mut p = provider(Rational::new(1, 10), StartOffset::ZERO, 50);
        p.queue_packet(packet(1, 0, 1));
        p.disable();
        assert_eq!(p.queued_packets(), 0);
        assert!(!p.queue_packet(packet(1, 1, 1)));
        let mut pump = ScriptPump::new(vec![packet(1, 2, 1)]);
        assert!(p.get_next_sample(&mut pump).is_none());
        // 未触发读取
        assert_eq!(pump.packets.len(), 1);

        p.enable();
        assert_eq!(p.get_next_sample(&mut pump).map(|s| s.timestamp), Some(2_000_000));
    }

    #[test]
    fn test_无帧的包立即重试() {
        let mut p = provider(Rational::new(1, 10), StartOffset::ZERO, 50);
        let mut pump = ScriptPump::new(vec![packet(0xEE, 0, 1), packet(1, 1, 1)]);
        let s = p.get_next_sample(&mut pump).unwrap();
        assert_eq!(s.timestamp, 1_000_000);
        assert_eq!(s.data.as_ref(), &[1, 1, 2]);
    }

    #[test]
    fn test_跳过坏包与超出上限() {
        let mut p = provider(Rational::new(1, 10), StartOffset::ZERO, 2);
        let mut pump = ScriptPump::new(vec![
            packet(0xFF, 0, 1),
            packet(0xFF, 1, 1),
            packet(1, 2, 1),
            packet(0xFF, 3, 1),
            packet(0xFF, 4, 1),
            packet(0xFF, 5, 1),
            packet(1, 6, 1),
        ]);
        assert_eq!(p.get_next_sample(&mut pump).map(|s| s.timestamp), Some(2_000_000));
        assert!(p.get_next_sample(&mut pump).is_none());
        assert!(!p.is_enabled());
    }

    #[test]
    fn test_读取失败禁用() {
        let mut p = provider(Rational::new(1, 10), StartOffset::ZERO, 50);
        let mut pump = ScriptPump::new(Vec::new());
        pump.fail = true;
        assert!(p.get_next_sample(&mut pump).is_none());
        assert!(!p.is_enabled());
    }
}
