//! 媒体会话.
//!
//! 打开输入, 选出最佳的视频流与音频流, 为它们创建样本提供者,
//! 并用一把锁串行化取样、定位与关闭. 会话可通过 `Arc` 在消费者线程间共享.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use violet_core::timestamp::{TICKS_PER_MICROSECOND, from_ticks};
use violet_core::{MediaType, TICKS_PER_SECOND, VioletError, VioletResult};
use violet_format::io::{CallbackBackend, FileBackend, ReadCallback, SeekCallback};
use violet_format::{Demuxer, Disposition, IoContext, Stream};

use crate::config::InteropConfig;
use crate::descriptor::{AudioDescriptor, StreamDescriptor, VideoDescriptor};
use crate::init::{Globals, ensure_initialized};
use crate::provider::{SampleProvider, open_audio_provider, open_video_provider};
use crate::reader::{PacketPump, PacketSink, ReadOutcome, Reader};
use crate::sample::MediaSample;
use crate::timing::compute_start_offset;

/// 会话锁保护的状态
struct SessionState {
    reader: Reader,
    video: Option<Box<dyn SampleProvider>>,
    audio: Option<Box<dyn SampleProvider>>,
    /// 容器起始时间 (微秒)
    container_start_us: Option<i64>,
    /// 是否尚未处理过启动请求
    first_seek: bool,
}

/// 为请求方驱动读取器, 另一个流的提供者一起参与分发
struct SessionPump<'a> {
    reader: &'a mut Reader,
    peer: Option<&'a mut dyn SampleProvider>,
}

impl PacketPump for SessionPump<'_> {
    fn pump(&mut self, requester: &mut dyn PacketSink) -> ReadOutcome {
        match self.peer.as_deref_mut() {
            Some(peer) => self.reader.read_packet(&mut [requester, peer.as_sink()]),
            None => self.reader.read_packet(&mut [requester]),
        }
    }
}

fn provider_ref(slot: &mut Option<Box<dyn SampleProvider>>) -> Option<&mut dyn SampleProvider> {
    match slot {
        Some(p) => Some(p.as_mut()),
        None => None,
    }
}

fn provider_of(state: &mut SessionState, kind: MediaType) -> Option<&mut dyn SampleProvider> {
    match kind {
        MediaType::Video => provider_ref(&mut state.video),
        MediaType::Audio => provider_ref(&mut state.audio),
        _ => None,
    }
}

/// 媒体会话
pub struct MediaSession {
    state: Mutex<Option<SessionState>>,
    descriptors: Vec<StreamDescriptor>,
    /// 时长 (刻度), 0 表示未知
    duration: i64,
}

impl MediaSession {
    /// 打开文件
    pub fn open_file(path: &str, config: &InteropConfig) -> VioletResult<Self> {
        if path.is_empty() {
            return Err(VioletError::InvalidInput("文件路径为空".into()));
        }
        let globals = ensure_initialized();
        let backend = FileBackend::open(path)
            .map_err(|e| VioletError::OpenFailed(format!("无法打开 {}: {}", path, e)))?;
        let mut io = IoContext::with_buffer_size(Box::new(backend), config.stream_buffer_size)?;
        let demuxer = globals
            .formats
            .open_input_with_options(&mut io, Some(path), &config.format_options)
            .map_err(|e| VioletError::OpenFailed(format!("无法解析 {}: {}", path, e)))?;
        Self::from_demuxer(globals, demuxer, io, config)
    }

    /// 从读取/定位回调打开
    ///
    /// 没有定位回调时输入只能顺序读取, 会话不支持定位.
    pub fn open_stream(
        read: ReadCallback,
        seek: Option<SeekCallback>,
        config: &InteropConfig,
    ) -> VioletResult<Self> {
        let globals = ensure_initialized();
        let backend = CallbackBackend::new(read, seek);
        let mut io = IoContext::with_buffer_size(Box::new(backend), config.stream_buffer_size)?;
        let demuxer = globals
            .formats
            .open_input_with_options(&mut io, None, &config.format_options)
            .map_err(|e| VioletError::OpenFailed(format!("无法解析输入流: {}", e)))?;
        Self::from_demuxer(globals, demuxer, io, config)
    }

    /// 使用调用方提供的 (尚未打开的) 解复用器
    pub fn open_with_demuxer(
        mut demuxer: Box<dyn Demuxer>,
        mut io: IoContext,
        config: &InteropConfig,
    ) -> VioletResult<Self> {
        let globals = ensure_initialized();
        for (key, value) in &config.format_options {
            if let Err(e) = demuxer.set_option(key, value) {
                warn!("丢弃无效的容器选项 {}={}: {}", key, value, e);
            }
        }
        demuxer
            .open(&mut io)
            .map_err(|e| VioletError::OpenFailed(format!("{} 解析失败: {}", demuxer.name(), e)))?;
        Self::from_demuxer(globals, demuxer, io, config)
    }

    fn from_demuxer(
        globals: &Globals,
        demuxer: Box<dyn Demuxer>,
        io: IoContext,
        config: &InteropConfig,
    ) -> VioletResult<Self> {
        let container_start_us = demuxer.start_time();
        let duration = demuxer
            .duration()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map_or(0, |secs| (secs * TICKS_PER_SECOND as f64) as i64);

        let video_stream = select_stream(globals, demuxer.streams(), MediaType::Video);
        let audio_stream = if config.is_frame_grabber {
            None
        } else {
            select_stream(globals, demuxer.streams(), MediaType::Audio)
        };
        if video_stream.is_none() && audio_stream.is_none() {
            return Err(VioletError::StreamNotFound(format!(
                "{} 中没有可解码的音视频流",
                demuxer.name()
            )));
        }

        let video = video_stream
            .map(|s| {
                let offset = compute_start_offset(container_start_us, s.start_time, s.time_base);
                open_video_provider(&s, globals, config, offset)
            })
            .transpose()?;
        let audio = audio_stream
            .map(|s| {
                let offset = compute_start_offset(container_start_us, s.start_time, s.time_base);
                open_audio_provider(&s, globals, config, offset)
            })
            .transpose()?;

        let descriptors: Vec<StreamDescriptor> = video
            .iter()
            .chain(audio.iter())
            .map(|p| p.descriptor().clone())
            .collect();
        info!(
            "打开媒体会话: 格式={}, 视频流={:?}, 音频流={:?}, 时长={} 刻度",
            demuxer.name(),
            video.as_ref().map(|p| p.stream_index()),
            audio.as_ref().map(|p| p.stream_index()),
            duration
        );

        Ok(Self {
            state: Mutex::new(Some(SessionState {
                reader: Reader::new(demuxer, io),
                video,
                audio,
                container_start_us,
                first_seek: true,
            })),
            descriptors,
            duration,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<SessionState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 全部流描述符 (视频在前)
    pub fn descriptors(&self) -> &[StreamDescriptor] {
        &self.descriptors
    }

    /// 视频流描述符
    pub fn video_descriptor(&self) -> Option<&VideoDescriptor> {
        self.descriptors.iter().find_map(|d| match d {
            StreamDescriptor::Video(v) => Some(v),
            StreamDescriptor::Audio(_) => None,
        })
    }

    /// 音频流描述符
    pub fn audio_descriptor(&self) -> Option<&AudioDescriptor> {
        self.descriptors.iter().find_map(|d| match d {
            StreamDescriptor::Audio(a) => Some(a),
            StreamDescriptor::Video(_) => None,
        })
    }

    /// 时长 (刻度), 0 表示未知
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// 是否支持定位
    pub fn can_seek(&self) -> bool {
        self.duration > 0
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.lock_state().is_none()
    }

    /// 取指定类型流的下一个样本
    ///
    /// 阻塞直到得到样本、到达末尾或出现不可恢复的错误;
    /// 没有该类型的流、流已结束或会话已关闭时返回 `None`.
    pub fn get_next_sample(&self, kind: MediaType) -> Option<MediaSample> {
        let mut guard = self.lock_state();
        let SessionState {
            reader,
            video,
            audio,
            ..
        } = guard.as_mut()?;
        let (target, peer) = match kind {
            MediaType::Video => (video, audio),
            MediaType::Audio => (audio, video),
            _ => return None,
        };
        let provider = target.as_mut()?;
        let mut pump = SessionPump {
            reader,
            peer: provider_ref(peer),
        };
        provider.get_next_sample(&mut pump)
    }

    /// 选择或取消选择某类型的流
    ///
    /// 取消选择时丢弃该流已排队的包, 之后读取器读到的该流数据包也直接丢弃.
    /// 重新选择后从读取器当前位置继续, 第一个样本标记为不连续.
    pub fn set_stream_enabled(&self, kind: MediaType, enabled: bool) -> VioletResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| VioletError::InvalidInput("会话已关闭".into()))?;
        let provider = provider_of(state, kind)
            .ok_or_else(|| VioletError::StreamNotFound(format!("会话中没有 {:?} 流", kind)))?;
        if enabled {
            provider.enable();
        } else {
            provider.disable();
        }
        debug!(
            "流 {} ({:?}) {}",
            provider.stream_index(),
            kind,
            if enabled { "已选择" } else { "已取消选择" }
        );
        Ok(())
    }

    /// 某类型的流是否处于选择状态, 没有该流或会话已关闭时为 false
    pub fn is_stream_enabled(&self, kind: MediaType) -> bool {
        let mut guard = self.lock_state();
        guard
            .as_mut()
            .and_then(|state| provider_of(state, kind))
            .is_some_and(|p| p.is_enabled())
    }

    /// 某类型的流队列中等待解码的包数
    pub fn queued_packets(&self, kind: MediaType) -> usize {
        let mut guard = self.lock_state();
        guard
            .as_mut()
            .and_then(|state| provider_of(state, kind))
            .map_or(0, |p| p.queued_packets())
    }

    /// 定位到 `position` (刻度)
    ///
    /// 失败时会话状态保持不变.
    pub fn seek(&self, position: i64) -> VioletResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| VioletError::SeekFailed("会话已关闭".into()))?;
        self.seek_locked(state, position)?;
        state.first_seek = false;
        Ok(())
    }

    /// 处理启动请求
    ///
    /// 返回 `Ok(Some(p))` 表示已定位到 `p`; `Ok(None)` 表示无需定位
    /// (未给出位置, 或打开后第一次请求从 0 开始).
    pub fn start(&self, position: Option<i64>) -> VioletResult<Option<i64>> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| VioletError::SeekFailed("会话已关闭".into()))?;
        let first = std::mem::replace(&mut state.first_seek, false);
        let Some(position) = position else {
            return Ok(None);
        };
        if first && position == 0 {
            debug!("首次从 0 开始, 无需定位");
            return Ok(None);
        }
        self.seek_locked(state, position)?;
        Ok(Some(position))
    }

    fn seek_locked(&self, state: &mut SessionState, position: i64) -> VioletResult<()> {
        if self.duration <= 0 {
            return Err(VioletError::SeekFailed("时长未知, 不支持定位".into()));
        }
        if position < 0 || position > self.duration {
            return Err(VioletError::SeekFailed(format!(
                "位置 {} 超出范围 [0, {}]",
                position, self.duration
            )));
        }

        let reference = state
            .video
            .as_deref()
            .or(state.audio.as_deref())
            .ok_or_else(|| VioletError::SeekFailed("没有可用于定位的流".into()))?;
        let stream_index = reference.stream_index();
        let time_base = reference.time_base();

        let start_ticks = state
            .container_start_us
            .unwrap_or(0)
            .saturating_mul(TICKS_PER_MICROSECOND);
        let corrected = position.saturating_add(start_ticks);
        let target = from_ticks(corrected, time_base);

        state.reader.seek(stream_index, target).map_err(|e| {
            warn!("定位到 {} 刻度失败: {}", position, e);
            VioletError::SeekFailed(e.to_string())
        })?;

        for provider in [state.video.as_deref_mut(), state.audio.as_deref_mut()]
            .into_iter()
            .flatten()
        {
            provider.flush();
        }
        debug!(
            "定位完成: {} 刻度 → 流 {} 时间 {}",
            position, stream_index, target
        );
        Ok(())
    }

    /// 关闭会话, 释放提供者与读取器
    ///
    /// 之后的取样返回 `None`, 定位返回错误. 可重复调用.
    pub fn shutdown(&self) {
        let mut guard = self.lock_state();
        if let Some(state) = guard.take() {
            let SessionState {
                reader,
                video,
                audio,
                ..
            } = state;
            drop(video);
            drop(audio);
            drop(reader);
            debug!("媒体会话已关闭");
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 选择给定类型的第一个有可用解码器的流, 跳过封面图
fn select_stream(globals: &Globals, streams: &[Stream], kind: MediaType) -> Option<Stream> {
    streams
        .iter()
        .filter(|s| s.media_type == kind)
        .filter(|s| !(kind == MediaType::Video && s.disposition.contains(Disposition::ATTACHED_PIC)))
        .find(|s| globals.codecs.has_decoder(s.codec_id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, SeekFrom};
    use std::sync::Arc;
    use violet_format::io::SeekOrigin;

    /// 8kHz 单声道 S16 WAV, 每个采样值为其序号
    fn make_wav(samples: u32) -> Vec<u8> {
        let pcm: Vec<u8> = (0..samples).flat_map(|i| (i as i16).to_le_bytes()).collect();
        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");
        body.extend_from_slice(b"fmt ");
        body.extend_from_slice(&16u32.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&8000u32.to_le_bytes());
        body.extend_from_slice(&16000u32.to_le_bytes());
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&16u16.to_le_bytes());
        body.extend_from_slice(b"data");
        body.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
        body.extend_from_slice(&pcm);
        let mut buf = b"RIFF".to_vec();
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&body);
        buf
    }

    fn callbacks(data: Vec<u8>) -> (ReadCallback, SeekCallback) {
        let cursor = Arc::new(std::sync::Mutex::new(Cursor::new(data)));
        let read_cursor = Arc::clone(&cursor);
        let read: ReadCallback = Box::new(move |buf| read_cursor.lock().unwrap().read(buf));
        let seek: SeekCallback = Box::new(move |offset, origin| {
            let mut c = cursor.lock().unwrap();
            match origin {
                SeekOrigin::Start => c.seek(SeekFrom::Start(offset as u64)),
                SeekOrigin::Current => c.seek(SeekFrom::Current(offset)),
                SeekOrigin::End => c.seek(SeekFrom::End(offset)),
                SeekOrigin::Size => Ok(c.get_ref().len() as u64),
            }
        });
        (read, seek)
    }

    fn packet_config(samples: u32) -> InteropConfig {
        InteropConfig {
            format_options: vec![("packet_samples".into(), samples.to_string())],
            ..Default::default()
        }
    }

    #[test]
    fn test_空路径() {
        assert!(matches!(
            MediaSession::open_file("", &InteropConfig::default()),
            Err(VioletError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_文件不存在() {
        assert!(matches!(
            MediaSession::open_file("/nonexistent/violet/none.wav", &InteropConfig::default()),
            Err(VioletError::OpenFailed(_))
        ));
    }

    #[test]
    fn test_打开文件() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &make_wav(800)).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let session = MediaSession::open_file(&path, &InteropConfig::default()).unwrap();
        let audio = session.audio_descriptor().unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.bits_per_sample, 16);
        assert!(session.video_descriptor().is_none());
        assert_eq!(session.duration(), 1_000_000);
        let sample = session.get_next_sample(MediaType::Audio).unwrap();
        assert_eq!(sample.data.len(), 1600);
        assert!(session.get_next_sample(MediaType::Video).is_none());
    }

    #[test]
    fn test_回调输入_取样与定位() {
        let (read, seek) = callbacks(make_wav(8000));
        let session = MediaSession::open_stream(read, Some(seek), &packet_config(800)).unwrap();
        assert_eq!(session.duration(), TICKS_PER_SECOND);
        assert!(session.can_seek());

        // 首次从 0 启动不定位
        assert_eq!(session.start(Some(0)).unwrap(), None);

        let timestamps: Vec<i64> = (0..3)
            .filter_map(|_| session.get_next_sample(MediaType::Audio))
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(timestamps, vec![0, 1_000_000, 2_000_000]);

        // 越界定位失败, 状态不变
        assert!(matches!(
            session.seek(TICKS_PER_SECOND + 1),
            Err(VioletError::SeekFailed(_))
        ));
        assert!(session.seek(-1).is_err());
        let next = session.get_next_sample(MediaType::Audio).unwrap();
        assert_eq!(next.timestamp, 3_000_000);
        assert!(!next.discontinuous);

        // 再次从 0 启动会真正定位
        assert_eq!(session.start(Some(0)).unwrap(), Some(0));
        let first = session.get_next_sample(MediaType::Audio).unwrap();
        assert!(first.discontinuous);
        assert_eq!(first.timestamp, 0);
        assert_eq!(i16::from_le_bytes([first.data[2], first.data[3]]), 1);

        session.seek(5_000_000).unwrap();
        let mid = session.get_next_sample(MediaType::Audio).unwrap();
        assert_eq!(mid.timestamp, 5_000_000);
        assert!(mid.discontinuous);

        assert_eq!(session.start(None).unwrap(), None);
    }

    #[test]
    fn test_末尾后返回空() {
        let (read, seek) = callbacks(make_wav(1600));
        let session = MediaSession::open_stream(read, Some(seek), &packet_config(800)).unwrap();
        assert!(session.get_next_sample(MediaType::Audio).is_some());
        assert!(session.get_next_sample(MediaType::Audio).is_some());
        assert!(session.get_next_sample(MediaType::Audio).is_none());
        assert!(session.get_next_sample(MediaType::Audio).is_none());
    }

    #[test]
    fn test_截图模式无视频流() {
        let (read, seek) = callbacks(make_wav(100));
        let config = InteropConfig {
            is_frame_grabber: true,
            ..Default::default()
        };
        assert!(matches!(
            MediaSession::open_stream(read, Some(seek), &config),
            Err(VioletError::StreamNotFound(_))
        ));
    }

    #[test]
    fn test_选择不存在的流() {
        let (read, seek) = callbacks(make_wav(1600));
        let session = MediaSession::open_stream(read, Some(seek), &packet_config(800)).unwrap();
        assert!(matches!(
            session.set_stream_enabled(MediaType::Video, false),
            Err(VioletError::StreamNotFound(_))
        ));
        assert!(session.set_stream_enabled(MediaType::Subtitle, true).is_err());
        assert!(!session.is_stream_enabled(MediaType::Video));
        assert!(session.is_stream_enabled(MediaType::Audio));

        session.set_stream_enabled(MediaType::Audio, false).unwrap();
        assert!(session.get_next_sample(MediaType::Audio).is_none());

        session.shutdown();
        assert!(session.set_stream_enabled(MediaType::Audio, true).is_err());
        assert!(!session.is_stream_enabled(MediaType::Audio));
        assert_eq!(session.queued_packets(MediaType::Audio), 0);
    }

    #[test]
    fn test_关闭后取样与定位() {
        let (read, seek) = callbacks(make_wav(8000));
        let session = Arc::new(MediaSession::open_stream(read, Some(seek), &packet_config(800)).unwrap());
        let worker = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.get_next_sample(MediaType::Audio).is_some())
        };
        assert!(worker.join().unwrap());

        session.shutdown();
        session.shutdown();
        assert!(session.is_closed());
        assert!(session.get_next_sample(MediaType::Audio).is_none());
        assert!(matches!(session.seek(0), Err(VioletError::SeekFailed(_))));
        assert!(session.start(Some(0)).is_err());
    }
}
