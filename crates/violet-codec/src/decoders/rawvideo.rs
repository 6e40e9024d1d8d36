//! RAW 视频解码器.
//!
//! 按像素格式把一个数据包拆成若干平面, 不做压缩/解压缩.
//! 打包 RGB 格式兼容 DIB 约定: 行宽按 4 字节对齐, extra_data 以
//! `BottomUp\0` 结尾时行序自下而上.

use log::debug;
use violet_core::{PixelFormat, VioletError, VioletResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{Frame, VideoFrame};
use crate::packet::Packet;

/// 行序自下而上的标记
pub const BOTTOM_UP_MARKER: &[u8] = b"BottomUp\0";

/// RAW 视频解码器
pub struct RawVideoDecoder {
    /// 图像宽度
    width: u32,
    /// 图像高度
    height: u32,
    /// 像素格式
    pixel_format: PixelFormat,
    /// 各平面紧凑行宽
    linesizes: Vec<usize>,
    /// 各平面的行数
    plane_heights: Vec<usize>,
    /// 行序自下而上 (仅单平面打包格式)
    bottom_up: bool,
    /// 已解码帧缓冲
    output_frame: Option<Frame>,
    /// 是否已打开 (配置参数)
    opened: bool,
    /// 是否已收到刷新信号 (空包)
    flushing: bool,
}

impl RawVideoDecoder {
    pub fn create() -> VioletResult<Box<dyn Decoder>> {
        Ok(Box::new(Self {
            width: 0,
            height: 0,
            pixel_format: PixelFormat::None,
            linesizes: Vec::new(),
            plane_heights: Vec::new(),
            bottom_up: false,
            output_frame: None,
            opened: false,
            flushing: false,
        }))
    }

    fn compact_size(&self) -> usize {
        self.linesizes
            .iter()
            .zip(&self.plane_heights)
            .map(|(ls, h)| ls * h)
            .sum()
    }

    /// 源数据中各平面的行宽: 紧凑排列, 或单平面格式按 4 字节对齐
    fn source_linesizes(&self, data_len: usize) -> Option<Vec<usize>> {
        if data_len == self.compact_size() {
            return Some(self.linesizes.clone());
        }
        if self.linesizes.len() == 1 {
            let aligned = (self.linesizes[0] + 3) & !3;
            if data_len == aligned * self.plane_heights[0] {
                return Some(vec![aligned]);
            }
        }
        None
    }
}

impl Decoder for RawVideoDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::RawVideo
    }

    fn name(&self) -> &str {
        "rawvideo"
    }

    fn open(&mut self, params: &CodecParameters) -> VioletResult<()> {
        let video = match &params.params {
            CodecParamsType::Video(v) => v,
            _ => {
                return Err(VioletError::InvalidArgument(
                    "rawvideo 解码器需要视频参数".into(),
                ));
            }
        };

        if video.width == 0 || video.height == 0 {
            return Err(VioletError::InvalidArgument("宽度和高度不能为 0".into()));
        }
        let pf = video.pixel_format;
        if pf.plane_count() == 0 {
            return Err(VioletError::InvalidArgument(format!(
                "rawvideo 不支持像素格式 {}",
                pf
            )));
        }

        let plane_count = pf.plane_count() as usize;
        let mut linesizes = Vec::with_capacity(plane_count);
        let mut plane_heights = Vec::with_capacity(plane_count);
        for i in 0..plane_count {
            let ls = pf.plane_linesize(i, video.width).ok_or_else(|| {
                VioletError::InvalidArgument(format!("无法计算平面 {} 的 linesize", i))
            })?;
            let ph = pf.plane_height(i, video.height).ok_or_else(|| {
                VioletError::InvalidArgument(format!("无法计算平面 {} 的高度", i))
            })?;
            linesizes.push(ls);
            plane_heights.push(ph);
        }

        self.width = video.width;
        self.height = video.height;
        self.pixel_format = pf;
        self.linesizes = linesizes;
        self.plane_heights = plane_heights;
        self.bottom_up = plane_count == 1 && params.extra_data.ends_with(BOTTOM_UP_MARKER);
        self.output_frame = None;
        self.opened = true;
        self.flushing = false;

        debug!(
            "打开 rawvideo 解码器: {}x{}, 格式={}, 帧大小={}, 自下而上={}",
            self.width,
            self.height,
            self.pixel_format,
            self.compact_size(),
            self.bottom_up,
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> VioletResult<()> {
        if !self.opened {
            return Err(VioletError::Codec("解码器未打开, 请先调用 open()".into()));
        }
        if self.output_frame.is_some() {
            return Err(VioletError::NeedMoreData);
        }

        // 空包 = flush
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }

        let src_linesizes = self.source_linesizes(packet.data.len()).ok_or_else(|| {
            VioletError::InvalidData(format!(
                "数据大小 {} 与预期帧大小 {} 不匹配",
                packet.data.len(),
                self.compact_size(),
            ))
        })?;

        let mut frame = VideoFrame::new(self.width, self.height, self.pixel_format);
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;
        frame.is_keyframe = true;

        // 按平面拆分, 去掉行尾对齐填充
        let mut offset = 0usize;
        for (i, &src_ls) in src_linesizes.iter().enumerate() {
            let ls = self.linesizes[i];
            let rows = self.plane_heights[i];
            let plane = &packet.data[offset..offset + src_ls * rows];
            let mut dst = Vec::with_capacity(ls * rows);
            for row in 0..rows {
                let src_row = if self.bottom_up { rows - 1 - row } else { row };
                let start = src_row * src_ls;
                dst.extend_from_slice(&plane[start..start + ls]);
            }
            frame.data[i] = dst;
            frame.linesize[i] = ls;
            offset += src_ls * rows;
        }

        self.output_frame = Some(Frame::Video(frame));
        Ok(())
    }

    fn receive_frame(&mut self) -> VioletResult<Frame> {
        if let Some(frame) = self.output_frame.take() {
            return Ok(frame);
        }
        if self.flushing {
            return Err(VioletError::Eof);
        }
        Err(VioletError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.output_frame = None;
        self.flushing = false;
    }

    fn pixel_format_candidates(&self) -> Vec<PixelFormat> {
        if self.opened {
            vec![self.pixel_format]
        } else {
            Vec::new()
        }
    }

    fn select_pixel_format(&mut self, format: PixelFormat) -> VioletResult<()> {
        if format == self.pixel_format {
            return Ok(());
        }
        Err(VioletError::Unsupported(format!(
            "rawvideo 只能输出码流格式 {}, 不能输出 {}",
            self.pixel_format, format
        )))
    }

    fn output_dimensions(&self) -> Option<(u32, u32)> {
        self.opened.then_some((self.width, self.height))
    }
}
