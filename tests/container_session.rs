//! 容器到样本的端到端测试.
//!
//! 在内存中生成 WAV/AVI 文件, 经探测、解复用、解码与格式转换后检查输出样本.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use violet::core::{MediaType, PixelFormat, Rational, TICKS_PER_SECOND, VioletError};
use violet::format::demuxers::wav::WavDemuxer;
use violet::format::io::{CallbackBackend, ReadCallback, SeekCallback, SeekOrigin};
use violet::format::IoContext;
use violet::{InteropConfig, MediaSession};

// ============================================================
// RIFF 构造工具
// ============================================================

fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(tag);
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
    if data.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

fn list(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"LIST");
    buf.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
    buf.extend_from_slice(kind);
    buf.extend_from_slice(body);
    buf
}

fn riff(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = b"RIFF".to_vec();
    buf.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
    buf.extend_from_slice(kind);
    buf.extend_from_slice(body);
    buf
}

fn wave_format(format_tag: u16, channels: u16, sample_rate: u32, bits: u16) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut d = Vec::new();
    d.extend_from_slice(&format_tag.to_le_bytes());
    d.extend_from_slice(&channels.to_le_bytes());
    d.extend_from_slice(&sample_rate.to_le_bytes());
    d.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    d.extend_from_slice(&block_align.to_le_bytes());
    d.extend_from_slice(&bits.to_le_bytes());
    d
}

/// 生成 WAV 文件
fn make_wav(format_tag: u16, channels: u16, sample_rate: u32, bits: u16, pcm: &[u8]) -> Vec<u8> {
    let mut body = chunk(b"fmt ", &wave_format(format_tag, channels, sample_rate, bits));
    body.extend(list(b"INFO", &chunk(b"INAM", b"tone\0")));
    body.extend(chunk(b"data", pcm));
    riff(b"WAVE", &body)
}

/// 8kHz 单声道 S16, 采样值为序号
fn s16_ramp(samples: u32) -> Vec<u8> {
    (0..samples).flat_map(|i| (i as i16).to_le_bytes()).collect()
}

fn strh(fcc_type: &[u8; 4], scale: u32, rate: u32, start: u32, length: u32, sample_size: u32) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(fcc_type);
    d.extend_from_slice(&[0u8; 4]);
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&[0u8; 4]);
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&scale.to_le_bytes());
    d.extend_from_slice(&rate.to_le_bytes());
    d.extend_from_slice(&start.to_le_bytes());
    d.extend_from_slice(&length.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&sample_size.to_le_bytes());
    d.extend_from_slice(&[0u8; 8]);
    chunk(b"strh", &d)
}

fn bitmap_info(width: i32, height: i32, bit_count: u16) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&40u32.to_le_bytes());
    d.extend_from_slice(&width.to_le_bytes());
    d.extend_from_slice(&height.to_le_bytes());
    d.extend_from_slice(&1u16.to_le_bytes());
    d.extend_from_slice(&bit_count.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&[0u8; 20]);
    chunk(b"strf", &d)
}

const AVIIF_KEYFRAME: u32 = 0x10;

/// `frames` 帧 4x2 Gray8 视频 (10fps, 偶数帧为关键帧) + 8kHz 单声道 S16,
/// 每帧后跟 800 个音频采样 (0.1 秒).
///
/// 视频按 DIB 自下而上存储: 第一行存储的是画面底行, 值为 `10*i+1`;
/// 第二行是画面顶行, 值为 `10*i+2`.
fn make_avi(frames: u32, start_half_second: bool) -> Vec<u8> {
    let (video_start, audio_start) = if start_half_second { (5, 4000) } else { (0, 0) };

    let mut video_strl = strh(b"vids", 1, 10, video_start, frames, 0);
    video_strl.extend(bitmap_info(4, 2, 8));
    video_strl.extend(chunk(b"strn", b"camera\0"));
    let mut audio_strl = strh(b"auds", 1, 8000, audio_start, frames * 800, 2);
    audio_strl.extend(chunk(b"strf", &wave_format(1, 1, 8000, 16)));

    let mut hdrl = chunk(b"avih", &[0u8; 56]);
    hdrl.extend(list(b"strl", &video_strl));
    hdrl.extend(list(b"strl", &audio_strl));

    let mut movi = Vec::new();
    let mut idx1 = Vec::new();
    for i in 0..frames {
        let bottom = (10 * i + 1) as u8;
        let top = (10 * i + 2) as u8;
        let mut frame = vec![bottom; 4];
        frame.extend_from_slice(&[top; 4]);
        let audio: Vec<u8> = (0..800).flat_map(|_| (i as i16).to_le_bytes()).collect();
        let video_flags = if i % 2 == 0 { AVIIF_KEYFRAME } else { 0 };
        for (tag, data, flags) in [(b"00db", frame, video_flags), (b"01wb", audio, AVIIF_KEYFRAME)] {
            idx1.extend_from_slice(tag);
            idx1.extend_from_slice(&flags.to_le_bytes());
            idx1.extend_from_slice(&(4 + movi.len() as u32).to_le_bytes());
            idx1.extend_from_slice(&(data.len() as u32).to_le_bytes());
            movi.extend(chunk(tag, &data));
        }
    }

    let mut body = list(b"hdrl", &hdrl);
    body.extend(list(b"movi", &movi));
    body.extend(chunk(b"idx1", &idx1));
    riff(b"AVI ", &body)
}

// ============================================================
// 输入工具
// ============================================================

fn init_test_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn temp_file(suffix: &str, data: &[u8]) -> tempfile::NamedTempFile {
    init_test_log();
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap_or_else(|e| panic!("创建临时文件失败: {}", e));
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

fn callbacks(data: Vec<u8>) -> (ReadCallback, SeekCallback) {
    init_test_log();
    let cursor = Arc::new(Mutex::new(Cursor::new(data)));
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

fn pull_all(session: &MediaSession, kind: MediaType) -> Vec<i64> {
    std::iter::from_fn(|| session.get_next_sample(kind))
        .map(|s| s.timestamp)
        .collect()
}

// ============================================================
// WAV
// ============================================================

#[test]
fn test_wav_文件按包取样() {
    let file = temp_file(".wav", &make_wav(1, 1, 8000, 16, &s16_ramp(8000)));
    let config = InteropConfig {
        format_options: vec![("packet_samples".into(), "2000".into())],
        ..Default::default()
    };
    let session = MediaSession::open_file(file.path().to_str().unwrap(), &config).unwrap();
    assert_eq!(session.duration(), TICKS_PER_SECOND);

    let audio = session.audio_descriptor().unwrap();
    assert_eq!((audio.sample_rate, audio.channels, audio.bits_per_sample), (8000, 1, 16));
    assert_eq!(audio.codec_name, "pcm_s16le");

    let first = session.get_next_sample(MediaType::Audio).unwrap();
    assert_eq!(first.data.len(), 4000);
    assert_eq!(first.duration, 2_500_000);
    assert_eq!(i16::from_le_bytes([first.data[2], first.data[3]]), 1);
    assert_eq!(pull_all(&session, MediaType::Audio), vec![2_500_000, 5_000_000, 7_500_000]);
}

#[test]
fn test_wav_浮点转_s16() {
    let pcm: Vec<u8> = [0.0f32, 0.5, -0.5, 1.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let (read, seek) = callbacks(make_wav(3, 2, 48000, 32, &pcm));
    let session = MediaSession::open_stream(read, Some(seek), &InteropConfig::default()).unwrap();
    let audio = session.audio_descriptor().unwrap();
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.bits_per_sample, 16);

    let sample = session.get_next_sample(MediaType::Audio).unwrap();
    let values: Vec<i16> = sample
        .data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(values.len(), 4);
    assert_eq!(values[0], 0);
    assert!((values[1] - 16384).abs() <= 1);
    assert!((values[2] + 16384).abs() <= 1);
    assert!(values[3] >= 32767);
}

#[test]
fn test_wav_u8_转_s16() {
    let (read, seek) = callbacks(make_wav(1, 1, 8000, 8, &[128, 255, 0]));
    let session = MediaSession::open_stream(read, Some(seek), &InteropConfig::default()).unwrap();
    let sample = session.get_next_sample(MediaType::Audio).unwrap();
    assert_eq!(sample.data.len(), 6);
    assert_eq!(i16::from_le_bytes([sample.data[0], sample.data[1]]), 0);
    assert!(i16::from_le_bytes([sample.data[4], sample.data[5]]) < -32000);
}

#[test]
fn test_不可定位输入() {
    init_test_log();
    let data = make_wav(1, 1, 8000, 16, &s16_ramp(1600));
    let cursor = Arc::new(Mutex::new(Cursor::new(data)));
    let read: ReadCallback = Box::new(move |buf| cursor.lock().unwrap().read(buf));
    let io = IoContext::new(Box::new(CallbackBackend::new(read, None)));
    let config = InteropConfig {
        format_options: vec![("packet_samples".into(), "800".into())],
        ..Default::default()
    };
    let session =
        MediaSession::open_with_demuxer(WavDemuxer::create().unwrap(), io, &config).unwrap();

    assert!(session.get_next_sample(MediaType::Audio).is_some());
    assert!(matches!(session.seek(0), Err(VioletError::SeekFailed(_))));
    // 定位失败后继续顺序读取
    let next = session.get_next_sample(MediaType::Audio).unwrap();
    assert_eq!(next.timestamp, 1_000_000);
    assert!(!next.discontinuous);
}

#[test]
fn test_无法识别的输入() {
    let file = temp_file(".bin", b"this is not a media file at all");
    assert!(matches!(
        MediaSession::open_file(file.path().to_str().unwrap(), &InteropConfig::default()),
        Err(VioletError::OpenFailed(_))
    ));
}

// ============================================================
// AVI
// ============================================================

#[test]
fn test_avi_描述符与交替取样() {
    let file = temp_file(".avi", &make_avi(4, false));
    let config = InteropConfig {
        video_output_allow_nv12: false,
        ..Default::default()
    };
    let session = MediaSession::open_file(file.path().to_str().unwrap(), &config).unwrap();
    assert_eq!(session.duration(), 4_000_000);

    let video = session.video_descriptor().unwrap();
    assert_eq!(video.subtype, PixelFormat::Yuv420p);
    assert_eq!((video.width, video.height), (4, 2));
    assert_eq!(video.frame_rate, Rational::new(10, 1));
    assert_eq!(video.name.as_deref(), Some("camera"));
    let audio = session.audio_descriptor().unwrap();
    assert_eq!(audio.sample_rate, 8000);

    for i in 0..4u8 {
        let v = session.get_next_sample(MediaType::Video).unwrap();
        assert_eq!(v.timestamp, i64::from(i) * 1_000_000);
        assert_eq!(v.data.len(), 8 + 2 + 2);
        // 自下而上的行序已翻转
        assert_eq!(v.data[0], 10 * i + 2);
        assert_eq!(v.data[4], 10 * i + 1);

        let a = session.get_next_sample(MediaType::Audio).unwrap();
        assert_eq!(a.timestamp, i64::from(i) * 1_000_000);
        assert_eq!(a.data.len(), 1600);
    }
    assert!(session.get_next_sample(MediaType::Video).is_none());
    assert!(session.get_next_sample(MediaType::Audio).is_none());
}

#[test]
fn test_avi_定位回退到关键帧() {
    let file = temp_file(".avi", &make_avi(6, false));
    let session =
        MediaSession::open_file(file.path().to_str().unwrap(), &InteropConfig::default()).unwrap();
    assert!(session.get_next_sample(MediaType::Video).is_some());

    // 0.3 秒落在非关键帧 3, 回退到关键帧 2
    assert_eq!(session.start(Some(3_000_000)).unwrap(), Some(3_000_000));
    let v = session.get_next_sample(MediaType::Video).unwrap();
    assert!(v.discontinuous);
    assert_eq!(v.timestamp, 2_000_000);
    let a = session.get_next_sample(MediaType::Audio).unwrap();
    assert!(a.discontinuous);
    assert_eq!(a.timestamp, 2_000_000);

    // 回到开头, 两个流都从 0 重新开始
    session.seek(0).unwrap();
    assert_eq!(pull_all(&session, MediaType::Video).first(), Some(&0));
    assert_eq!(pull_all(&session, MediaType::Audio).len(), 6);
}

#[test]
fn test_avi_起始偏移() {
    let (read, seek) = callbacks(make_avi(3, true));
    let session = MediaSession::open_stream(read, Some(seek), &InteropConfig::default()).unwrap();
    assert_eq!(pull_all(&session, MediaType::Video), vec![0, 1_000_000, 2_000_000]);
    assert_eq!(pull_all(&session, MediaType::Audio), vec![0, 1_000_000, 2_000_000]);
}

#[test]
fn test_avi_截图模式() {
    let file = temp_file(".avi", &make_avi(2, false));
    let config = InteropConfig {
        is_frame_grabber: true,
        ..Default::default()
    };
    let session = MediaSession::open_file(file.path().to_str().unwrap(), &config).unwrap();
    assert!(session.audio_descriptor().is_none());
    assert_eq!(pull_all(&session, MediaType::Video), vec![0, 1_000_000]);
}
