//! 色度采样位置定义.

/// 4:2:0 / 4:2:2 色度样本相对亮度样本的位置
///
/// ```text
///  Left  Center
///   X  .  X        X = 亮度样本
///   L  C           TopLeft 与第一个亮度样本重合
///   X     X
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaLocation {
    /// 未指定
    #[default]
    Unspecified,
    /// 水平与左侧亮度对齐, 垂直居中 (MPEG-2 4:2:0)
    Left,
    /// 水平垂直均居中 (MPEG-1 / JPEG)
    Center,
    /// 与左上亮度样本重合 (4:2:2 / DV)
    TopLeft,
    /// 水平居中, 与上方亮度对齐
    Top,
    /// 与左下亮度样本对齐
    BottomLeft,
    /// 水平居中, 与下方亮度对齐
    Bottom,
}
