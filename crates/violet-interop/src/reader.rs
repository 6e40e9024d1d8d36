//! 共享读取器.
//!
//! 读取器持有解复用器与 I/O 上下文, 每次读取一个容器数据包,
//! 按流索引交给对应的 [`PacketSink`], 没有接收者或接收者拒绝时丢弃.
//! 到达末尾后锁存 EOF, 直到成功定位才清除.

use log::{debug, warn};
use violet_codec::Packet;
use violet_core::{VioletError, VioletResult};
use violet_format::{Demuxer, IoContext, SeekFlags, Stream};

/// 数据包接收者 (各流的样本提供者)
pub trait PacketSink {
    /// 所属流索引
    fn stream_index(&self) -> usize;

    /// 接收一个数据包, 返回 false 表示已丢弃 (流已禁用)
    fn queue_packet(&mut self, packet: Packet) -> bool;
}

/// 一次读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 包已放入某个流的队列
    Queued,
    /// 包已丢弃 (无接收者或流已禁用)
    Dropped,
    /// 已到达末尾
    Eof,
    /// 读取出错
    Failed,
}

/// 驱动读取器为请求方补充数据包
///
/// 提供者队列为空时调用, 请求方本身也作为接收者参与分发.
pub trait PacketPump {
    /// 读取一个包并分发
    fn pump(&mut self, requester: &mut dyn PacketSink) -> ReadOutcome;
}

/// 共享读取器
pub struct Reader {
    demuxer: Box<dyn Demuxer>,
    io: IoContext,
    eof: bool,
}

impl Reader {
    /// 创建读取器, 解复用器必须已打开
    pub fn new(demuxer: Box<dyn Demuxer>, io: IoContext) -> Self {
        Self {
            demuxer,
            io,
            eof: false,
        }
    }

    /// 流列表
    pub fn streams(&self) -> &[Stream] {
        self.demuxer.streams()
    }

    /// 解复用器
    pub fn demuxer(&self) -> &dyn Demuxer {
        self.demuxer.as_ref()
    }

    /// 是否已锁存 EOF
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// 读取一个包并交给流索引匹配的接收者
    pub fn read_packet(&mut self, sinks: &mut [&mut dyn PacketSink]) -> ReadOutcome {
        if self.eof {
            return ReadOutcome::Eof;
        }
        let packet = match self.demuxer.read_packet(&mut self.io) {
            Ok(p) => p,
            Err(VioletError::Eof) => {
                debug!("读取器到达末尾");
                self.eof = true;
                return ReadOutcome::Eof;
            }
            Err(e) => {
                warn!("读取数据包失败: {}", e);
                return ReadOutcome::Failed;
            }
        };

        let index = packet.stream_index;
        match sinks.iter_mut().find(|s| s.stream_index() == index) {
            Some(sink) => {
                if sink.queue_packet(packet) {
                    ReadOutcome::Queued
                } else {
                    ReadOutcome::Dropped
                }
            }
            None => ReadOutcome::Dropped,
        }
    }

    /// 向后定位到 `stream_index` 上目标时间 (流时间基) 之前最近的关键帧
    ///
    /// 成功后清除 EOF 锁存; 失败时状态不变.
    pub fn seek(&mut self, stream_index: usize, target: i64) -> VioletResult<()> {
        self.demuxer
            .seek(&mut self.io, stream_index, target, SeekFlags::default())?;
        self.eof = false;
        debug!("读取器定位: 流 {} → {}", stream_index, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use violet_codec::CodecId;
    use violet_core::Rational;
    use violet_format::FormatId;
    use violet_format::io::MemoryBackend;
    use violet_format::stream::StreamParams;

    /// 按脚本输出数据包的解复用器
    struct ScriptDemuxer {
        streams: Vec<Stream>,
        script: Vec<VioletResult<usize>>,
        pos: usize,
        reads: usize,
    }

    impl ScriptDemuxer {
        fn new(script: Vec<VioletResult<usize>>) -> Self {
            let streams = (0..2)
                .map(|i| Stream::new(i, CodecId::None, Rational::new(1, 10), StreamParams::Other))
                .collect();
            Self {
                streams,
                script,
                pos: 0,
                reads: 0,
            }
        }
    }

    impl Demuxer for ScriptDemuxer {
        fn format_id(&self) -> FormatId {
            FormatId::Wav
        }

        fn name(&self) -> &str {
            "script"
        }

        fn open(&mut self, _io: &mut IoContext) -> VioletResult<()> {
            Ok(())
        }

        fn streams(&self) -> &[Stream] {
            &self.streams
        }

        fn read_packet(&mut self, _io: &mut IoContext) -> VioletResult<Packet> {
            self.reads += 1;
            if self.pos >= self.script.len() {
                return Err(VioletError::Eof);
            }
            let step = std::mem::replace(&mut self.script[self.pos], Ok(0));
            self.pos += 1;
            let index = step?;
            let mut pkt = Packet::from_data(vec![0u8; 2]);
            pkt.stream_index = index;
            pkt.pts = self.pos as i64;
            Ok(pkt)
        }

        fn seek(
            &mut self,
            _io: &mut IoContext,
            _stream_index: usize,
            timestamp: i64,
            _flags: SeekFlags,
        ) -> VioletResult<()> {
            if timestamp < 0 {
                return Err(VioletError::SeekFailed("负时间".into()));
            }
            self.pos = 0;
            Ok(())
        }

        fn duration(&self) -> Option<f64> {
            None
        }
    }

    struct VecSink {
        index: usize,
        accept: bool,
        got: Vec<i64>,
    }

    impl PacketSink for VecSink {
        fn stream_index(&self) -> usize {
            self.index
        }

        fn queue_packet(&mut self, packet: Packet) -> bool {
            if self.accept {
                self.got.push(packet.pts);
            }
            self.accept
        }
    }

    fn reader(script: Vec<VioletResult<usize>>) -> Reader {
        let io = IoContext::new(Box::new(MemoryBackend::from_data(Vec::new())));
        Reader::new(Box::new(ScriptDemuxer::new(script)), io)
    }

    #[test]
    fn test_按流索引分发() {
        let mut r = reader(vec![Ok(0), Ok(1), Ok(0), Ok(5)]);
        let mut a = VecSink { index: 0, accept: true, got: Vec::new() };
        let mut b = VecSink { index: 1, accept: true, got: Vec::new() };
        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(r.read_packet(&mut [&mut a, &mut b]));
        }
        assert_eq!(
            outcomes,
            vec![
                ReadOutcome::Queued,
                ReadOutcome::Queued,
                ReadOutcome::Queued,
                ReadOutcome::Dropped
            ]
        );
        assert_eq!(a.got, vec![1, 3]);
        assert_eq!(b.got, vec![2]);
    }

    #[test]
    fn test_禁用的流丢弃() {
        let mut r = reader(vec![Ok(0)]);
        let mut a = VecSink { index: 0, accept: false, got: Vec::new() };
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Dropped);
        assert!(a.got.is_empty());
    }

    #[test]
    fn test_eof_锁存直到定位() {
        let mut r = reader(vec![Ok(0)]);
        let mut a = VecSink { index: 0, accept: true, got: Vec::new() };
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Queued);
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Eof);
        assert!(r.is_eof());
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Eof);

        // 定位失败不清除锁存
        assert!(r.seek(0, -1).is_err());
        assert!(r.is_eof());

        r.seek(0, 0).unwrap();
        assert!(!r.is_eof());
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Queued);
        assert_eq!(a.got, vec![1, 1]);
    }

    #[test]
    fn test_读取错误不锁存() {
        let mut r = reader(vec![Err(VioletError::InvalidData("坏块".into())), Ok(0)]);
        let mut a = VecSink { index: 0, accept: true, got: Vec::new() };
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Failed);
        assert!(!r.is_eof());
        assert_eq!(r.read_packet(&mut [&mut a]), ReadOutcome::Queued);
    }
}
