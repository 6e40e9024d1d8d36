//! 起始时间偏移.
//!
//! 容器起始时间非零时, 所有样本时间戳都要减去一个固定偏移,
//! 使第一个样本落在 0 附近. 偏移有两种算法:
//! - 精确: 流起始时间换算成微秒后与容器起始时间一致, 直接用流时间基换算刻度
//! - 粗略: 否则用容器起始时间 (微秒) × 10

use log::{debug, warn};
use violet_core::timestamp::{TICKS_PER_MICROSECOND, to_ticks};
use violet_core::{NOPTS_VALUE, Rational};

/// 偏移的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffsetPath {
    /// 容器起始时间未设置或为 0
    None,
    /// 流起始时间与容器起始时间一致
    Precise,
    /// 使用容器起始时间
    Coarse,
}

/// 起始时间偏移 (100ns 刻度)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOffset {
    /// 偏移量
    pub ticks: i64,
    /// 计算路径
    pub path: StartOffsetPath,
}

impl StartOffset {
    /// 零偏移
    pub const ZERO: Self = Self {
        ticks: 0,
        path: StartOffsetPath::None,
    };
}

/// 计算流的起始时间偏移
///
/// # 参数
/// - `container_start_us`: 容器起始时间 (微秒)
/// - `stream_start`: 流起始时间 (流时间基), 未设置为 `NOPTS_VALUE`
/// - `time_base`: 流时间基
pub fn compute_start_offset(
    container_start_us: Option<i64>,
    stream_start: i64,
    time_base: Rational,
) -> StartOffset {
    let container_us = match container_start_us {
        Some(us) if us != 0 => us,
        _ => return StartOffset::ZERO,
    };

    let stream_us = if stream_start != NOPTS_VALUE && time_base.is_valid() {
        let us = i128::from(stream_start) * i128::from(time_base.num) * 1_000_000
            / i128::from(time_base.den);
        i64::try_from(us).ok()
    } else {
        None
    };

    if stream_us == Some(container_us) {
        let ticks = to_ticks(stream_start, time_base);
        debug!(
            "起始偏移取流时间基精确值: {} 刻度 (start={}, tb={})",
            ticks, stream_start, time_base
        );
        return StartOffset {
            ticks,
            path: StartOffsetPath::Precise,
        };
    }

    let ticks = container_us.saturating_mul(TICKS_PER_MICROSECOND);
    if let Some(us) = stream_us {
        warn!(
            "流起始时间 {}us 与容器起始时间 {}us 不一致, 使用容器值",
            us, container_us
        );
    } else {
        debug!("起始偏移取容器起始时间: {} 刻度", ticks);
    }
    StartOffset {
        ticks,
        path: StartOffsetPath::Coarse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_容器起始为零或未设置() {
        let tb = Rational::new(1, 90000);
        assert_eq!(compute_start_offset(None, 900, tb), StartOffset::ZERO);
        assert_eq!(compute_start_offset(Some(0), 900, tb), StartOffset::ZERO);
    }

    #[test]
    fn test_精确路径() {
        // 1/3 秒无法用整数微秒精确表示, 精确路径保留流时间基的刻度
        let tb = Rational::new(1, 3);
        let offset = compute_start_offset(Some(333_333), 1, tb);
        assert_eq!(offset.path, StartOffsetPath::Precise);
        assert_eq!(offset.ticks, 3_333_333);
    }

    #[test]
    fn test_粗略路径() {
        let tb = Rational::new(1, 1000);
        let offset = compute_start_offset(Some(1_500_000), 1000, tb);
        assert_eq!(offset.path, StartOffsetPath::Coarse);
        assert_eq!(offset.ticks, 15_000_000);

        let offset = compute_start_offset(Some(2_000), NOPTS_VALUE, tb);
        assert_eq!(offset.path, StartOffsetPath::Coarse);
        assert_eq!(offset.ticks, 20_000);
    }
}
