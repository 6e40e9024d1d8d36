//! 时间戳类型与 100ns 计时单位换算.
//!
//! 流内时间戳以各自的 `time_base` 计数, 对外输出的样本时间戳统一为
//! 100 纳秒计时单位 (tick, 每秒 10_000_000). 所有换算走 i128 交叉乘法,
//! 避免浮点精度损失.

use crate::rational::Rational;
use std::fmt;

/// 表示"未定义"的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 每秒的 tick 数 (100ns 单位)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// 每微秒的 tick 数
pub const TICKS_PER_MICROSECOND: i64 = 10;

/// 时间戳
///
/// 实际时间 (秒) = pts * time_base.num / time_base.den.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// 时间戳值, `NOPTS_VALUE` 表示未定义
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
}

impl Timestamp {
    /// 创建新的时间戳
    pub const fn new(pts: i64, time_base: Rational) -> Self {
        Self { pts, time_base }
    }

    /// 创建未定义的时间戳
    pub const fn none() -> Self {
        Self {
            pts: NOPTS_VALUE,
            time_base: Rational::UNDEFINED,
        }
    }

    /// 判断时间戳是否有效 (非 NOPTS_VALUE)
    pub const fn is_valid(&self) -> bool {
        self.pts != NOPTS_VALUE && self.time_base.is_valid()
    }

    /// 转换为秒 (f64), 无效时间戳返回 `f64::NAN`
    pub fn to_seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.pts as f64 * self.time_base.to_f64()
    }

    /// 将时间戳重缩放到新的时间基
    ///
    /// new_pts = pts * old_tb.num * new_tb.den / (old_tb.den * new_tb.num)
    pub fn rescale(&self, new_time_base: Rational) -> Self {
        if !self.is_valid() || !new_time_base.is_valid() {
            return Self::none();
        }
        match rescale_raw(self.pts, self.time_base, new_time_base) {
            Some(pts) => Self {
                pts,
                time_base: new_time_base,
            },
            None => Self::none(),
        }
    }

    /// 转换为 100ns tick, 无效时间戳返回 `None`
    pub fn to_ticks(&self) -> Option<i64> {
        if !self.is_valid() {
            return None;
        }
        rescale_raw(self.pts, self.time_base, Rational::TICKS)
    }
}

/// 将 `time_base` 计数的值换算为 100ns tick (向零截断)
///
/// 时间基无效时返回 0.
pub fn to_ticks(value: i64, time_base: Rational) -> i64 {
    rescale_raw(value, time_base, Rational::TICKS).unwrap_or(0)
}

/// 将 100ns tick 换算回 `time_base` 计数 (向零截断)
///
/// 时间基无效时返回 0.
pub fn from_ticks(ticks: i64, time_base: Rational) -> i64 {
    rescale_raw(ticks, Rational::TICKS, time_base).unwrap_or(0)
}

fn rescale_raw(value: i64, from: Rational, to: Rational) -> Option<i64> {
    let num = i128::from(value) * i128::from(from.num) * i128::from(to.den);
    let den = i128::from(from.den) * i128::from(to.num);
    if den == 0 {
        return None;
    }
    let result = num / den;
    i64::try_from(result).ok()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "NOPTS")
        } else {
            write!(f, "{:.6}s", self.to_seconds())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_重缩放() {
        let ts = Timestamp::new(90000, Rational::new(1, 90000));
        assert_eq!(ts.rescale(Rational::new(1, 1000)).pts, 1000);
    }

    #[test]
    fn test_timestamp_无效值() {
        let ts = Timestamp::none();
        assert!(!ts.is_valid());
        assert!(ts.to_seconds().is_nan());
        assert_eq!(ts.to_ticks(), None);
    }

    #[test]
    fn test_ticks_换算() {
        // 1/25 时间基下 1 帧 = 40ms = 400_000 tick
        assert_eq!(to_ticks(1, Rational::new(1, 25)), 400_000);
        assert_eq!(to_ticks(90000, Rational::new(1, 90000)), TICKS_PER_SECOND);
        assert_eq!(from_ticks(400_000, Rational::new(1, 25)), 1);
        assert_eq!(from_ticks(TICKS_PER_SECOND, Rational::new(1, 44100)), 44100);
    }

    #[test]
    fn test_ticks_截断与无效时间基() {
        // 1/3 秒 = 3_333_333.33 tick, 向零截断
        assert_eq!(to_ticks(1, Rational::new(1, 3)), 3_333_333);
        assert_eq!(to_ticks(-1, Rational::new(1, 3)), -3_333_333);
        assert_eq!(to_ticks(5, Rational::UNDEFINED), 0);
    }
}
