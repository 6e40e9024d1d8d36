//! violet-pull - 样本拉取工具
//!
//! 打开媒体文件, 打印会话选中的流描述符, 然后按音视频交替的顺序
//! 取出若干解码样本并打印时间戳与大小.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use violet::interop::descriptor::{NominalRange, StreamDescriptor};
use violet::logging::{self, LoggingConfig};
use violet::{InteropConfig, MediaSample, MediaSession};
use violet_core::MediaType;
use violet_core::timestamp::TICKS_PER_SECOND;

/// Violet 样本拉取工具
#[derive(Parser, Debug)]
#[command(name = "violet-pull", version, about = "纯 Rust 拉取式解码样本工具")]
struct Cli {
    /// 输入文件路径
    input: String,

    /// 取出的样本总数 (各流合计)
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,

    /// 开始前定位到的位置 (秒)
    #[arg(long)]
    seek: Option<f64>,

    /// 只拉取视频
    #[arg(long, conflicts_with = "audio_only")]
    video_only: bool,

    /// 只拉取音频
    #[arg(long)]
    audio_only: bool,

    /// 会话配置文件 (JSON)
    #[arg(long)]
    config: Option<String>,

    /// 截图模式: 不打开音频流
    #[arg(long)]
    frame_grabber: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: String,

    /// 日志详细程度 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整输出
#[derive(Serialize)]
struct PullOutput {
    file: String,
    /// 时长 (秒)
    duration: f64,
    can_seek: bool,
    streams: Vec<StreamInfo>,
    samples: Vec<SampleInfo>,
}

/// 流描述符摘要
#[derive(Serialize)]
struct StreamInfo {
    index: usize,
    codec_type: &'static str,
    codec_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    // 视频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_range: Option<bool>,
    // 音频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_per_sample: Option<u32>,
}

/// 单个样本摘要
#[derive(Serialize)]
struct SampleInfo {
    codec_type: &'static str,
    /// 时间戳 (秒)
    time: f64,
    /// 时长 (秒)
    duration: f64,
    size: usize,
    discontinuous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    interlaced: Option<bool>,
}

// ============================================================
// 主逻辑
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LoggingConfig {
        directory: cli.log_dir.clone(),
        file_prefix: "violet-pull".to_string(),
        ..LoggingConfig::default().with_verbosity(cli.verbose)
    };
    if let Err(e) = logging::init(log_config) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    let mut config = match &cli.config {
        Some(path) => load_config(Path::new(path))?,
        None => InteropConfig::default(),
    };
    if cli.frame_grabber {
        config.is_frame_grabber = true;
    }

    let session = MediaSession::open_file(&cli.input, &config)
        .with_context(|| format!("无法打开 '{}'", cli.input))?;
    info!("已打开 {}, 共 {} 个流", cli.input, session.descriptors().len());

    if let Some(seconds) = cli.seek {
        let position = seconds_to_ticks(seconds)?;
        if !session.can_seek() {
            warn!("输入不可定位, 忽略 --seek");
        } else {
            session
                .start(Some(position))
                .with_context(|| format!("定位到 {seconds} 秒失败"))?;
        }
    }

    let kinds = pull_order(&session, cli.video_only, cli.audio_only);
    deselect_unpulled(&session, &kinds);
    let samples = pull_samples(&session, &kinds, cli.count);
    let streams: Vec<StreamInfo> = session.descriptors().iter().map(build_stream_info).collect();
    let duration = ticks_to_seconds(session.duration());
    let can_seek = session.can_seek();
    session.shutdown();

    if cli.json {
        let output = PullOutput {
            file: cli.input.clone(),
            duration,
            can_seek,
            streams,
            samples,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&cli.input, duration, can_seek, &streams, &samples);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<InteropConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置失败, path={}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("解析配置失败, path={}", path.display()))
}

fn seconds_to_ticks(seconds: f64) -> Result<i64> {
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("定位位置必须是非负秒数: {seconds}");
    }
    Ok((seconds * TICKS_PER_SECOND as f64).round() as i64)
}

fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// 根据会话中实际存在的流决定拉取顺序
fn pull_order(session: &MediaSession, video_only: bool, audio_only: bool) -> Vec<MediaType> {
    let mut kinds = Vec::new();
    if !audio_only && session.video_descriptor().is_some() {
        kinds.push(MediaType::Video);
    }
    if !video_only && session.audio_descriptor().is_some() {
        kinds.push(MediaType::Audio);
    }
    kinds
}

/// 取消选择不拉取的流, 避免其数据包在队列中堆积
fn deselect_unpulled(session: &MediaSession, kinds: &[MediaType]) {
    let present = [
        (MediaType::Video, session.video_descriptor().is_some()),
        (MediaType::Audio, session.audio_descriptor().is_some()),
    ];
    for (kind, exists) in present {
        if exists && !kinds.contains(&kind) {
            if let Err(e) = session.set_stream_enabled(kind, false) {
                warn!("取消选择 {} 流失败: {}", codec_type_name(kind), e);
            }
        }
    }
}

/// 轮流从各流取样本, 某流结束后继续取其余流
fn pull_samples(session: &MediaSession, kinds: &[MediaType], count: usize) -> Vec<SampleInfo> {
    let mut active = kinds.to_vec();
    let mut samples = Vec::with_capacity(count);
    let mut turn = 0usize;
    while samples.len() < count && !active.is_empty() {
        let slot = turn % active.len();
        let kind = active[slot];
        match session.get_next_sample(kind) {
            Some(sample) => {
                samples.push(sample_info(kind, &sample));
                turn += 1;
            }
            None => {
                info!("{} 流已结束", codec_type_name(kind));
                active.remove(slot);
            }
        }
    }
    samples
}

fn codec_type_name(kind: MediaType) -> &'static str {
    match kind {
        MediaType::Video => "video",
        MediaType::Audio => "audio",
        MediaType::Subtitle => "subtitle",
        MediaType::Data => "data",
        MediaType::Attachment => "attachment",
    }
}

fn sample_info(kind: MediaType, sample: &MediaSample) -> SampleInfo {
    SampleInfo {
        codec_type: codec_type_name(kind),
        time: ticks_to_seconds(sample.timestamp),
        duration: ticks_to_seconds(sample.duration),
        size: sample.data.len(),
        discontinuous: sample.discontinuous,
        interlaced: sample.properties.interlaced,
    }
}

fn build_stream_info(desc: &StreamDescriptor) -> StreamInfo {
    let mut info = StreamInfo {
        index: desc.stream_index(),
        codec_type: codec_type_name(desc.media_type()),
        codec_name: String::new(),
        language: None,
        pixel_format: None,
        width: None,
        height: None,
        frame_rate: None,
        pixel_aspect_ratio: None,
        full_range: None,
        sample_rate: None,
        channels: None,
        bits_per_sample: None,
    };
    match desc {
        StreamDescriptor::Video(v) => {
            info.codec_name = v.codec_name.clone();
            info.language = v.language.clone();
            info.pixel_format = Some(format!("{}", v.subtype));
            info.width = Some(v.width);
            info.height = Some(v.height);
            if v.frame_rate.is_valid() {
                info.frame_rate = Some(format!("{}/{}", v.frame_rate.num, v.frame_rate.den));
            }
            info.pixel_aspect_ratio = v.pixel_aspect_ratio.map(|r| format!("{}/{}", r.num, r.den));
            info.full_range = v
                .nominal_range
                .map(|range| range == NominalRange::Full0To255);
        }
        StreamDescriptor::Audio(a) => {
            info.codec_name = a.codec_name.clone();
            info.language = a.language.clone();
            info.sample_rate = Some(a.sample_rate);
            info.channels = Some(a.channels);
            info.bits_per_sample = Some(a.bits_per_sample);
        }
    }
    info
}

fn print_text(
    file: &str,
    duration: f64,
    can_seek: bool,
    streams: &[StreamInfo],
    samples: &[SampleInfo],
) {
    println!("输入: {file}");
    println!("  时长: {duration:.3} 秒, 可定位: {can_seek}");
    for s in streams {
        match (s.width, s.height, s.sample_rate) {
            (Some(w), Some(h), _) => println!(
                "  流 #{}: 视频 {} -> {} {}x{}",
                s.index,
                s.codec_name,
                s.pixel_format.as_deref().unwrap_or("?"),
                w,
                h
            ),
            (_, _, Some(rate)) => println!(
                "  流 #{}: 音频 {} -> s16 {} Hz × {} 声道",
                s.index,
                s.codec_name,
                rate,
                s.channels.unwrap_or(0)
            ),
            _ => println!("  流 #{}: {}", s.index, s.codec_type),
        }
    }
    println!("样本:");
    for s in samples {
        println!(
            "  {:5} t={:>10.4}s d={:.4}s {:>8} 字节{}",
            s.codec_type,
            s.time,
            s.duration,
            s.size,
            if s.discontinuous { " [不连续]" } else { "" }
        );
    }
}
