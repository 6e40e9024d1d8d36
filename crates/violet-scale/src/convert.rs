//! 像素格式转换模块.
//!
//! 把任意受支持的源格式按行写成 NV12 / YUV420P / BGRA 紧凑缓冲区.
//! 每个输出平面按行并行处理.
//!
//! 使用 BT.601 标准色彩矩阵:
//! ```text
//! Y  =  0.299 * R + 0.587 * G + 0.114 * B
//! Cb = -0.169 * R - 0.331 * G + 0.500 * B + 128
//! Cr =  0.500 * R - 0.419 * G - 0.081 * B + 128
//! ```

use rayon::prelude::*;
use violet_core::{PixelFormat, VioletError, VioletResult};

/// 像素格式转换输入 (各平面数据切片)
pub struct ConvertInput<'a> {
    /// 各平面数据
    pub planes: Vec<&'a [u8]>,
    /// 各平面行字节数
    pub linesize: Vec<usize>,
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
    /// 像素格式
    pub format: PixelFormat,
}

impl ConvertInput<'_> {
    /// 检查平面数量与长度是否足以覆盖整幅图像
    pub fn validate(&self) -> VioletResult<()> {
        let plane_count = self.format.plane_count() as usize;
        if self.planes.len() < plane_count || self.linesize.len() < plane_count {
            return Err(VioletError::InvalidArgument(format!(
                "{} 需要 {} 个平面, 实际 {}",
                self.format,
                plane_count,
                self.planes.len()
            )));
        }
        for plane in 0..plane_count {
            let row_bytes = self
                .format
                .plane_linesize(plane, self.width)
                .unwrap_or(0);
            let rows = self.format.plane_height(plane, self.height).unwrap_or(0);
            let stride = self.linesize[plane];
            if stride < row_bytes {
                return Err(VioletError::InvalidArgument(format!(
                    "平面 {} 行宽 {} 小于 {}",
                    plane, stride, row_bytes
                )));
            }
            let needed = if rows == 0 {
                0
            } else {
                (rows - 1) * stride + row_bytes
            };
            if self.planes[plane].len() < needed {
                return Err(VioletError::InvalidArgument(format!(
                    "平面 {} 数据不足: 需要 {} 字节, 实际 {}",
                    plane,
                    needed,
                    self.planes[plane].len()
                )));
            }
        }
        Ok(())
    }
}

/// 是否可以作为转换源
pub fn is_source_supported(format: PixelFormat) -> bool {
    is_yuv_family(format) || is_rgb_family(format)
}

fn is_yuv_family(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Yuv420p
            | PixelFormat::Yuvj420p
            | PixelFormat::Yuva420p
            | PixelFormat::Yuv422p
            | PixelFormat::Yuv444p
            | PixelFormat::Nv12
            | PixelFormat::Nv21
            | PixelFormat::Gray8
    )
}

fn is_rgb_family(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Rgb24 | PixelFormat::Bgr24 | PixelFormat::Rgba | PixelFormat::Bgra
    )
}

// ============================================================
// BT.601 颜色空间转换常量 (定点数, 缩放 256 倍)
// ============================================================

const Y_R: i32 = 77;
const Y_G: i32 = 150;
const Y_B: i32 = 29;

const CB_R: i32 = -43;
const CB_G: i32 = -85;
const CB_B: i32 = 128;

const CR_R: i32 = 128;
const CR_G: i32 = -107;
const CR_B: i32 = -21;

fn rgb_to_y(r: i32, g: i32, b: i32) -> u8 {
    ((Y_R * r + Y_G * g + Y_B * b + 128) >> 8).clamp(0, 255) as u8
}

fn rgb_to_cbcr(r: i32, g: i32, b: i32) -> (u8, u8) {
    let cb = ((CB_R * r + CB_G * g + CB_B * b + 128) >> 8) + 128;
    let cr = ((CR_R * r + CR_G * g + CR_B * b + 128) >> 8) + 128;
    (cb.clamp(0, 255) as u8, cr.clamp(0, 255) as u8)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = i32::from(y);
    let u = i32::from(u) - 128;
    let v = i32::from(v) - 128;
    let r = (y + ((v * 359 + 128) >> 8)).clamp(0, 255);
    let g = (y - ((u * 88 + v * 183 + 128) >> 8)).clamp(0, 255);
    let b = (y + ((u * 454 + 128) >> 8)).clamp(0, 255);
    (r as u8, g as u8, b as u8)
}

// ============================================================
// 源像素读取
// ============================================================

/// 读取 RGB 族源像素 (r, g, b, a)
fn rgb_at(src: &ConvertInput, row: usize, col: usize) -> (i32, i32, i32, u8) {
    let line = &src.planes[0][row * src.linesize[0]..];
    match src.format {
        PixelFormat::Rgb24 => {
            let p = &line[col * 3..col * 3 + 3];
            (i32::from(p[0]), i32::from(p[1]), i32::from(p[2]), 255)
        }
        PixelFormat::Bgr24 => {
            let p = &line[col * 3..col * 3 + 3];
            (i32::from(p[2]), i32::from(p[1]), i32::from(p[0]), 255)
        }
        PixelFormat::Rgba => {
            let p = &line[col * 4..col * 4 + 4];
            (i32::from(p[0]), i32::from(p[1]), i32::from(p[2]), p[3])
        }
        _ => {
            let p = &line[col * 4..col * 4 + 4];
            (i32::from(p[2]), i32::from(p[1]), i32::from(p[0]), p[3])
        }
    }
}

/// 读取 YUV 族源像素的亮度
fn luma_at(src: &ConvertInput, row: usize, col: usize) -> u8 {
    src.planes[0][row * src.linesize[0] + col]
}

/// 读取 YUV 族源像素所在位置的色度 (u, v)
fn chroma_at(src: &ConvertInput, row: usize, col: usize) -> (u8, u8) {
    match src.format {
        PixelFormat::Gray8 => (128, 128),
        PixelFormat::Nv12 | PixelFormat::Nv21 => {
            let off = (row >> 1) * src.linesize[1] + (col >> 1) * 2;
            let pair = (src.planes[1][off], src.planes[1][off + 1]);
            if src.format == PixelFormat::Nv12 {
                pair
            } else {
                (pair.1, pair.0)
            }
        }
        fmt => {
            let (sub_h, sub_v) = fmt.chroma_subsampling();
            let crow = row >> sub_v;
            let ccol = col >> sub_h;
            (
                src.planes[1][crow * src.linesize[1] + ccol],
                src.planes[2][crow * src.linesize[2] + ccol],
            )
        }
    }
}

fn alpha_at(src: &ConvertInput, row: usize, col: usize) -> u8 {
    if src.format == PixelFormat::Yuva420p {
        src.planes[3][row * src.linesize[3] + col]
    } else {
        255
    }
}

/// 4:2:0 色度采样: 对 2x2 块 (越界部分忽略) 取平均
fn chroma_420(src: &ConvertInput, cy: usize, cx: usize) -> (u8, u8) {
    let w = src.width as usize;
    let h = src.height as usize;
    let rows = (cy * 2)..(cy * 2 + 2).min(h);
    let cols = (cx * 2)..(cx * 2 + 2).min(w);

    if is_rgb_family(src.format) {
        let (mut sr, mut sg, mut sb, mut n) = (0i32, 0i32, 0i32, 0i32);
        for row in rows {
            for col in cols.clone() {
                let (r, g, b, _) = rgb_at(src, row, col);
                sr += r;
                sg += g;
                sb += b;
                n += 1;
            }
        }
        return rgb_to_cbcr(sr / n, sg / n, sb / n);
    }

    let (mut su, mut sv, mut n) = (0u32, 0u32, 0u32);
    for row in rows {
        for col in cols.clone() {
            let (u, v) = chroma_at(src, row, col);
            su += u32::from(u);
            sv += u32::from(v);
            n += 1;
        }
    }
    (((su + n / 2) / n) as u8, ((sv + n / 2) / n) as u8)
}

// ============================================================
// 目标格式写出
// ============================================================

/// 写亮度平面 (行宽 = width)
fn write_luma(src: &ConvertInput, y_out: &mut [u8]) {
    let w = src.width as usize;
    let rgb = is_rgb_family(src.format);
    y_out
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(row, line)| {
            for (col, out) in line.iter_mut().enumerate() {
                *out = if rgb {
                    let (r, g, b, _) = rgb_at(src, row, col);
                    rgb_to_y(r, g, b)
                } else {
                    luma_at(src, row, col)
                };
            }
        });
}

/// 写 YUV420P: Y 平面后依次为 U、V 平面
pub fn write_yuv420p(src: &ConvertInput, dst: &mut [u8]) {
    let w = src.width as usize;
    let h = src.height as usize;
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let (y_out, chroma) = dst.split_at_mut(w * h);
    let (u_out, v_out) = chroma.split_at_mut(cw * ch);
    write_luma(src, y_out);

    u_out[..cw * ch]
        .par_chunks_mut(cw)
        .zip(v_out[..cw * ch].par_chunks_mut(cw))
        .enumerate()
        .for_each(|(cy, (u_line, v_line))| {
            for cx in 0..cw {
                let (u, v) = chroma_420(src, cy, cx);
                u_line[cx] = u;
                v_line[cx] = v;
            }
        });
}

/// 写 NV12: Y 平面后为 UV 交错平面
pub fn write_nv12(src: &ConvertInput, dst: &mut [u8]) {
    let w = src.width as usize;
    let h = src.height as usize;
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let (y_out, uv_out) = dst.split_at_mut(w * h);
    write_luma(src, y_out);

    uv_out[..cw * 2 * ch]
        .par_chunks_mut(cw * 2)
        .enumerate()
        .for_each(|(cy, line)| {
            for (cx, pair) in line.chunks_exact_mut(2).enumerate() {
                let (u, v) = chroma_420(src, cy, cx);
                pair[0] = u;
                pair[1] = v;
            }
        });
}

/// 写 BGRA (行宽 = width * 4)
pub fn write_bgra(src: &ConvertInput, dst: &mut [u8]) {
    let w = src.width as usize;
    let h = src.height as usize;
    let rgb = is_rgb_family(src.format);

    dst[..w * 4 * h]
        .par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(row, line)| {
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let (r, g, b, a) = if rgb {
                    let (r, g, b, a) = rgb_at(src, row, col);
                    (r as u8, g as u8, b as u8, a)
                } else {
                    let (u, v) = chroma_at(src, row, col);
                    let (r, g, b) = yuv_to_rgb(luma_at(src, row, col), u, v);
                    (r, g, b, alpha_at(src, row, col))
                };
                px[0] = b;
                px[1] = g;
                px[2] = r;
                px[3] = a;
            }
        });
}

/// 同格式: 按紧凑行宽逐平面复制
pub fn copy_planes(src: &ConvertInput, format: PixelFormat, dst: &mut [u8]) {
    let mut offset = 0;
    for plane in 0..format.plane_count() as usize {
        let row_bytes = format.plane_linesize(plane, src.width).unwrap_or(0);
        let rows = format.plane_height(plane, src.height).unwrap_or(0);
        let stride = src.linesize[plane];
        for row in 0..rows {
            dst[offset..offset + row_bytes]
                .copy_from_slice(&src.planes[plane][row * stride..row * stride + row_bytes]);
            offset += row_bytes;
        }
    }
}
