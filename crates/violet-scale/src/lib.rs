//! # violet-scale
//!
//! Violet 像素格式转换库.
//!
//! 把解码器输出的各种像素格式转换为消费者接受的三种格式之一:
//! - NV12 (Y 平面 + UV 交错平面)
//! - IYUV / YUV420P (Y, U, V 三平面)
//! - BGRA (32 位打包)
//!
//! 只做格式转换, 不改变分辨率. 输出写入紧凑排列的连续缓冲区.

pub mod convert;

use log::debug;
use violet_core::{PixelFormat, VioletError, VioletResult};

use convert::ConvertInput;

/// 检查给定的格式转换是否支持
pub fn is_conversion_supported(src: PixelFormat, dst: PixelFormat) -> bool {
    matches!(
        dst,
        PixelFormat::Nv12 | PixelFormat::Yuv420p | PixelFormat::Bgra
    ) && convert::is_source_supported(src)
}

/// 像素格式转换上下文
///
/// 按 (尺寸, 源格式, 目标格式) 配置一次, 之后每帧复用.
#[derive(Debug, Clone)]
pub struct ScaleContext {
    /// 图像宽度
    pub width: u32,
    /// 图像高度
    pub height: u32,
    /// 源像素格式
    pub src_format: PixelFormat,
    /// 目标像素格式
    pub dst_format: PixelFormat,
}

impl ScaleContext {
    /// 创建转换上下文
    pub fn new(
        width: u32,
        height: u32,
        src_format: PixelFormat,
        dst_format: PixelFormat,
    ) -> VioletResult<Self> {
        if width == 0 || height == 0 {
            return Err(VioletError::InvalidArgument(format!(
                "图像尺寸无效: {}x{}",
                width, height
            )));
        }
        if !is_conversion_supported(src_format, dst_format) {
            return Err(VioletError::Unsupported(format!(
                "不支持的格式转换: {} → {}",
                src_format, dst_format
            )));
        }
        debug!(
            "创建转换上下文: {}x{} {} → {}",
            width, height, src_format, dst_format
        );
        Ok(Self {
            width,
            height,
            src_format,
            dst_format,
        })
    }

    /// 输出缓冲区所需字节数
    pub fn output_size(&self) -> usize {
        self.dst_format
            .frame_size(self.width, self.height)
            .unwrap_or(0)
    }

    /// 执行格式转换
    ///
    /// # 参数
    /// - `src_data`: 源图像各平面数据
    /// - `src_linesize`: 源图像各平面行字节数
    /// - `dst`: 输出缓冲区, 长度至少为 `output_size()`
    pub fn convert(
        &self,
        src_data: &[&[u8]],
        src_linesize: &[usize],
        dst: &mut [u8],
    ) -> VioletResult<()> {
        let input = ConvertInput {
            planes: src_data.to_vec(),
            linesize: src_linesize.to_vec(),
            width: self.width,
            height: self.height,
            format: self.src_format,
        };
        input.validate()?;

        let needed = self.output_size();
        if dst.len() < needed {
            return Err(VioletError::InvalidArgument(format!(
                "输出缓冲区不足: 需要 {} 字节, 实际 {}",
                needed,
                dst.len()
            )));
        }

        // 同一内存布局直接复制
        let same_layout = self.src_format == self.dst_format
            || (self.src_format == PixelFormat::Yuvj420p && self.dst_format == PixelFormat::Yuv420p);
        if same_layout {
            convert::copy_planes(&input, self.dst_format, dst);
            return Ok(());
        }

        match self.dst_format {
            PixelFormat::Nv12 => convert::write_nv12(&input, dst),
            PixelFormat::Yuv420p => convert::write_yuv420p(&input, dst),
            _ => convert::write_bgra(&input, dst),
        }
        Ok(())
    }
}
