use std::fs;
use std::path::{Path, PathBuf};

use violet::logging::{LOG_ENV, LoggingConfig, init};

// 注意: 由于 tracing 的全局订阅器只能初始化一次,
// 涉及 init() 的测试必须单独运行或使用 #[ignore] 标记

fn test_config(dir: &Path, prefix: &str, level: &str) -> LoggingConfig {
    LoggingConfig {
        level: level.to_string(),
        directory: dir.to_string_lossy().to_string(),
        file_prefix: prefix.to_string(),
        compress_history: false,
        ..Default::default()
    }
}

/// 获取当前日期的日志文件路径
fn today_log_path(dir: &Path, prefix: &str) -> PathBuf {
    let today = chrono::Local::now().date_naive();
    dir.join(format!("{}.{}.log", prefix, today.format("%Y-%m-%d")))
}

/// 8kHz 单声道 S16 WAV
fn make_wav(samples: u32) -> Vec<u8> {
    let pcm: Vec<u8> = (0..samples).flat_map(|i| (i as i16).to_le_bytes()).collect();
    let mut body = b"WAVE".to_vec();
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

#[tokio::test]
#[ignore] // 需要单独运行: cargo test --test logging_system test_logging_file_content -- --ignored
async fn test_logging_file_content() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("nested").join("logs");
    init(test_config(&log_dir, "content-test", "info")).expect("日志初始化失败");
    assert!(log_dir.exists(), "嵌套日志目录应该被创建");

    // 第二次初始化被拒绝
    assert!(init(test_config(&log_dir, "again", "info")).is_err());

    tracing::error!("错误日志_ERROR_MSG");
    tracing::info!("信息日志_INFO_MSG: 路径={}", "/测试/路径.wav");
    tracing::debug!("调试日志_DEBUG_MSG");

    // 库 crate 经 log 门面输出的日志也进入同一文件
    let mut wav = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
    std::io::Write::write_all(&mut wav, &make_wav(800)).unwrap();
    let session = violet::MediaSession::open_file(
        wav.path().to_str().unwrap(),
        &violet::InteropConfig::default(),
    )
    .unwrap();
    drop(session);

    std::thread::sleep(std::time::Duration::from_millis(200));

    let log_file = today_log_path(&log_dir, "content-test");
    let content = fs::read_to_string(&log_file)
        .unwrap_or_else(|e| panic!("读取日志文件失败: {:?}, 错误: {}", log_file, e));

    assert!(content.contains("错误日志_ERROR_MSG"), "应该包含错误日志");
    assert!(content.contains("信息日志_INFO_MSG: 路径=/测试/路径.wav"));
    assert!(content.contains("INFO"), "日志应该包含 INFO 级别标记");
    assert!(content.contains("打开媒体会话"), "应该包含会话日志, 文件内容:\n{}", content);
    if std::env::var(LOG_ENV).is_err() {
        assert!(!content.contains("调试日志_DEBUG_MSG"), "debug 日志应该被过滤掉");
    }
}

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, "info");
    assert_eq!(config.console_level, "warn");
    assert_eq!(config.file_prefix, "violet");
    assert_eq!(config.retention_days, 30, "默认保留天数应该是 30");
    assert!(config.compress_history, "默认应该开启压缩");
    assert_eq!(config.cleanup_interval_seconds, 3600, "默认清理间隔应该是 3600 秒");
    assert!(config.validate().is_ok());
}

#[test]
fn test_logging_config_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        retention_days: -1,
        ..test_config(dir.path(), "bad", "info")
    };
    // 校验失败发生在安装订阅器之前, 不影响其他测试
    assert!(init(config).is_err());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
