//! # violet-resample
//!
//! Violet 音频采样格式转换库.
//!
//! 把解码器输出的任意采样格式 (交错或平面) 转换为交错排列的目标格式,
//! 样本管线固定使用有符号 16 位. 不改变采样率与声道数.

pub mod convert;

use log::debug;
use violet_core::{SampleFormat, VioletError, VioletResult};

pub use convert::{decode_sample, encode_sample};

/// 采样格式转换上下文
///
/// 按 (源格式, 声道数, 目标格式) 配置一次, 之后每帧复用.
#[derive(Debug, Clone)]
pub struct ResampleContext {
    /// 源采样格式
    pub src_format: SampleFormat,
    /// 声道数
    pub channels: u32,
    /// 目标采样格式 (交错)
    pub dst_format: SampleFormat,
}

impl ResampleContext {
    /// 创建转换上下文, 目标格式必须是交错格式
    pub fn new(src_format: SampleFormat, channels: u32, dst_format: SampleFormat) -> VioletResult<Self> {
        if channels == 0 {
            return Err(VioletError::InvalidArgument("声道数为 0".into()));
        }
        if src_format.bytes_per_sample() == 0 || dst_format.bytes_per_sample() == 0 {
            return Err(VioletError::InvalidArgument(format!(
                "无效的采样格式: {} → {}",
                src_format, dst_format
            )));
        }
        if dst_format.is_planar() {
            return Err(VioletError::Unsupported(format!(
                "目标格式必须是交错格式: {}",
                dst_format
            )));
        }
        debug!(
            "创建采样转换上下文: {} × {} 声道 → {}",
            src_format, channels, dst_format
        );
        Ok(Self {
            src_format,
            channels,
            dst_format,
        })
    }

    /// 输出 `nb_samples` 个采样 (每声道) 所需字节数
    pub fn output_size(&self, nb_samples: u32) -> usize {
        nb_samples as usize * self.channels as usize * self.dst_format.bytes_per_sample() as usize
    }

    /// 执行转换
    ///
    /// # 参数
    /// - `planes`: 源数据; 平面格式每声道一个平面, 交错格式只有一个平面
    /// - `nb_samples`: 每声道采样数
    ///
    /// # 返回
    /// 交错排列的目标格式字节
    pub fn convert(&self, planes: &[&[u8]], nb_samples: u32) -> VioletResult<Vec<u8>> {
        let channels = self.channels as usize;
        let samples = nb_samples as usize;
        let src_bps = self.src_format.bytes_per_sample() as usize;
        let planar = self.src_format.is_planar();

        let (plane_count, plane_len) = if planar {
            (channels, samples * src_bps)
        } else {
            (1, samples * channels * src_bps)
        };
        if planes.len() < plane_count {
            return Err(VioletError::InvalidArgument(format!(
                "需要 {} 个平面, 实际 {}",
                plane_count,
                planes.len()
            )));
        }
        if let Some(short) = planes[..plane_count].iter().find(|p| p.len() < plane_len) {
            return Err(VioletError::InvalidArgument(format!(
                "数据不足: 期望 {} 字节, 实际 {} 字节",
                plane_len,
                short.len()
            )));
        }

        let out_len = self.output_size(nb_samples);
        let mut output = Vec::new();
        output.try_reserve_exact(out_len).map_err(|e| {
            VioletError::ResourceExhausted(format!("无法分配 {} 字节音频缓冲区: {}", out_len, e))
        })?;

        // 同格式交错: 直接复制
        if !planar && self.src_format == self.dst_format {
            output.extend_from_slice(&planes[0][..plane_len]);
            return Ok(output);
        }
        // 平面转交错, 位宽不变: 逐样本搬运字节
        if planar && self.src_format.to_interleaved() == self.dst_format {
            for s in 0..samples {
                for plane in &planes[..channels] {
                    output.extend_from_slice(&plane[s * src_bps..(s + 1) * src_bps]);
                }
            }
            return Ok(output);
        }

        for s in 0..samples {
            for ch in 0..channels {
                let (plane, index) = if planar { (ch, s) } else { (0, s * channels + ch) };
                let off = index * src_bps;
                let value = decode_sample(&planes[plane][off..off + src_bps], self.src_format)?;
                encode_sample(value, self.dst_format, &mut output)?;
            }
        }
        Ok(output)
    }
}
