//! 容器格式标识符.

use std::fmt;

/// 容器格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// Audio Video Interleave (AVI)
    Avi,
    /// WAV (RIFF WAVE)
    Wav,
}

impl FormatId {
    /// 获取格式的短名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Avi => "avi",
            Self::Wav => "wav",
        }
    }

    /// 获取格式常用的文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Avi => &["avi"],
            Self::Wav => &["wav", "wave"],
        }
    }

    /// 文件名的扩展名是否属于该格式 (不区分大小写)
    pub fn matches_extension(&self, filename: &str) -> bool {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return false;
        };
        self.extensions()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
