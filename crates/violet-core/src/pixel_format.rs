//! 像素格式定义.
//!
//! 涵盖解码器可能输出的软件格式、管线的三种输出格式 (NV12 / IYUV / BGRA),
//! 以及解码器在格式协商中可能报出的硬件加速格式.

use std::fmt;

/// 像素格式
///
/// 命名规则: 颜色空间 + 排列方式 (p = Planar, j = 全范围 JPEG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    None,

    // ========================
    // YUV 平面格式 (Planar)
    // ========================
    /// YUV 4:2:0 平面格式, 8 位 (IYUV 输出即此格式)
    Yuv420p,
    /// YUV 4:2:0 平面格式, 8 位, 全范围 (0-255)
    Yuvj420p,
    /// YUV 4:2:0 平面格式 + Alpha 平面, 8 位
    Yuva420p,
    /// YUV 4:2:2 平面格式, 8 位
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,

    // ========================
    // YUV 半平面格式
    // ========================
    /// NV12: Y 平面 + UV 交错, 4:2:0 (默认输出格式)
    Nv12,
    /// NV21: Y 平面 + VU 交错, 4:2:0
    Nv21,

    // ========================
    // RGB 打包格式 (Packed)
    // ========================
    /// RGB 各 8 位, 打包
    Rgb24,
    /// BGR 各 8 位, 打包
    Bgr24,
    /// RGBA 各 8 位, 打包
    Rgba,
    /// BGRA 各 8 位, 打包 (BGRA8 输出即此格式)
    Bgra,

    // ========================
    // 灰度格式
    // ========================
    /// 灰度 8 位
    Gray8,

    // ========================
    // 硬件加速格式 (仅出现在协商候选中, 管线总是跳过)
    // ========================
    /// Direct3D 11 表面
    D3d11,
    /// DXVA2 表面
    Dxva2Vld,
    /// VA-API 表面
    Vaapi,
    /// VideoToolbox 表面
    VideoToolbox,
    /// CUDA 设备内存
    Cuda,
}

impl PixelFormat {
    /// 是否为硬件加速格式 (数据不在系统内存中)
    pub const fn is_hwaccel(&self) -> bool {
        matches!(
            self,
            Self::D3d11 | Self::Dxva2Vld | Self::Vaapi | Self::VideoToolbox | Self::Cuda
        )
    }

    /// 是否带 Alpha 分量
    pub const fn has_alpha(&self) -> bool {
        matches!(self, Self::Yuva420p | Self::Rgba | Self::Bgra)
    }

    /// 是否为全范围 (0-255) YUV 格式
    pub const fn is_full_range(&self) -> bool {
        matches!(self, Self::Yuvj420p)
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    ///
    /// 例如 YUV420 返回 (1, 1), 表示色度分辨率为亮度的 1/2 x 1/2.
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuvj420p | Self::Yuva420p | Self::Nv12 | Self::Nv21 => (1, 1),
            Self::Yuv422p => (1, 0),
            _ => (0, 0),
        }
    }

    /// 是否为三平面 (或带 Alpha 的四平面) YUV 格式
    pub const fn is_planar_yuv(&self) -> bool {
        matches!(
            self,
            Self::Yuv420p | Self::Yuvj420p | Self::Yuva420p | Self::Yuv422p | Self::Yuv444p
        )
    }

    /// 平面数量, 硬件格式为 0
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::Yuva420p => 4,
            Self::Yuv420p | Self::Yuvj420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 | Self::Nv21 => 2,
            Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra | Self::Gray8 => 1,
            _ => 0,
        }
    }

    /// 计算指定平面每行的字节数 (linesize / stride)
    ///
    /// 色度平面宽度向上取整, 奇数宽度也能放下最后一列.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let w = width as usize;
        let (sub_h, _) = self.chroma_subsampling();
        let chroma_w = (w + (1 << sub_h) - 1) >> sub_h;
        Some(match self {
            // plane 3 为 Alpha, 与亮度同尺寸
            Self::Yuv420p | Self::Yuvj420p | Self::Yuva420p | Self::Yuv422p | Self::Yuv444p => {
                if plane == 0 || plane == 3 { w } else { chroma_w }
            }
            // plane1 = UV 交错, 每个色度样本 2 字节
            Self::Nv12 | Self::Nv21 => {
                if plane == 0 { w } else { chroma_w * 2 }
            }
            Self::Rgb24 | Self::Bgr24 => w * 3,
            Self::Rgba | Self::Bgra => w * 4,
            Self::Gray8 => w,
            _ => return None,
        })
    }

    /// 计算指定平面的行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() as usize {
            return None;
        }
        let h = height as usize;
        let (_, sub_v) = self.chroma_subsampling();
        if plane == 0 || plane == 3 || sub_v == 0 {
            return Some(h);
        }
        Some((h + (1 << sub_v) - 1) >> sub_v)
    }

    /// 计算紧凑排列 (linesize = 行宽) 时整帧的字节数
    ///
    /// 格式为 None 或硬件格式时返回 `None`.
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        if self.plane_count() == 0 {
            return None;
        }
        let mut total = 0usize;
        for plane in 0..self.plane_count() as usize {
            let linesize = self.plane_linesize(plane, width)?;
            let plane_h = self.plane_height(plane, height)?;
            total += linesize * plane_h;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuvj420p => "yuvj420p",
            Self::Yuva420p => "yuva420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::Nv21 => "nv21",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
            Self::Gray8 => "gray8",
            Self::D3d11 => "d3d11",
            Self::Dxva2Vld => "dxva2_vld",
            Self::Vaapi => "vaapi",
            Self::VideoToolbox => "videotoolbox",
            Self::Cuda => "cuda",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv420p_frame_size() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.frame_size(1920, 1080), Some(1920 * 1080 * 3 / 2));
        assert_eq!(pf.plane_linesize(1, 1920), Some(960));
        assert_eq!(pf.plane_height(2, 1080), Some(540));
    }

    #[test]
    fn test_nv12_frame_size() {
        let pf = PixelFormat::Nv12;
        assert_eq!(pf.plane_linesize(0, 1920), Some(1920));
        assert_eq!(pf.plane_linesize(1, 1920), Some(1920));
        assert_eq!(pf.plane_height(1, 1080), Some(540));
        assert_eq!(pf.frame_size(1920, 1080), Some(1920 * 1080 * 3 / 2));
    }

    #[test]
    fn test_奇数尺寸_色度向上取整() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.plane_linesize(1, 5), Some(3));
        assert_eq!(pf.plane_height(1, 3), Some(2));
        assert_eq!(PixelFormat::Nv12.plane_linesize(1, 5), Some(6));
    }

    #[test]
    fn test_yuva420p_四平面() {
        let pf = PixelFormat::Yuva420p;
        assert_eq!(pf.plane_count(), 4);
        assert_eq!(pf.plane_linesize(3, 64), Some(64));
        assert_eq!(pf.frame_size(64, 32), Some(64 * 32 * 5 / 2));
        assert!(pf.has_alpha());
    }

    #[test]
    fn test_硬件格式无平面() {
        assert!(PixelFormat::D3d11.is_hwaccel());
        assert!(!PixelFormat::Nv12.is_hwaccel());
        assert_eq!(PixelFormat::Cuda.frame_size(16, 16), None);
        assert_eq!(PixelFormat::None.plane_linesize(0, 16), None);
    }

    #[test]
    fn test_packed_格式() {
        assert_eq!(PixelFormat::Bgra.frame_size(320, 240), Some(320 * 240 * 4));
        assert_eq!(PixelFormat::Bgr24.plane_linesize(0, 10), Some(30));
        assert_eq!(PixelFormat::Rgb24.plane_linesize(1, 10), None);
    }
}
