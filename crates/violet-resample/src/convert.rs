//! 单个采样的编解码.
//!
//! 所有格式之间的转换都经过归一化 f64 (-1.0 ~ 1.0) 中间值完成.

use violet_core::{SampleFormat, VioletError, VioletResult};

/// 将原始字节解码为归一化 f64 样本 (-1.0 ~ 1.0)
pub fn decode_sample(data: &[u8], format: SampleFormat) -> VioletResult<f64> {
    match format.to_interleaved() {
        SampleFormat::U8 => Ok((f64::from(data[0]) - 128.0) / 128.0),
        SampleFormat::S16 => Ok(f64::from(i16::from_le_bytes([data[0], data[1]])) / 32768.0),
        SampleFormat::S32 => {
            let v = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            Ok(f64::from(v) / 2_147_483_648.0)
        }
        SampleFormat::F32 => Ok(f64::from(f32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        SampleFormat::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&data[..8]);
            Ok(f64::from_le_bytes(raw))
        }
        _ => Err(VioletError::Unsupported(format!(
            "不支持的采样格式: {format}"
        ))),
    }
}

/// 将归一化 f64 样本编码为原始字节, 超出范围时截断
pub fn encode_sample(value: f64, format: SampleFormat, output: &mut Vec<u8>) -> VioletResult<()> {
    match format.to_interleaved() {
        SampleFormat::U8 => {
            output.push(((value * 128.0) + 128.0).round().clamp(0.0, 255.0) as u8);
        }
        SampleFormat::S16 => {
            let v = (value * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
            output.extend_from_slice(&v.to_le_bytes());
        }
        SampleFormat::S32 => {
            let v = (value * 2_147_483_648.0)
                .round()
                .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
            output.extend_from_slice(&v.to_le_bytes());
        }
        SampleFormat::F32 => output.extend_from_slice(&(value as f32).to_le_bytes()),
        SampleFormat::F64 => output.extend_from_slice(&value.to_le_bytes()),
        _ => {
            return Err(VioletError::Unsupported(format!(
                "不支持的采样格式: {format}"
            )));
        }
    }
    Ok(())
}
