//! 容器格式注册表.
//!
//! 管理所有已注册的解复用器, 支持按格式标识查找和自动探测.

use std::collections::HashMap;

use log::{debug, warn};
use violet_core::{VioletError, VioletResult};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeResult};

/// 解复用器工厂函数类型
pub type DemuxerFactory = fn() -> VioletResult<Box<dyn Demuxer>>;

/// 探测时最多读取的头部字节数
const PROBE_SIZE: usize = 8192;

/// 容器格式注册表
pub struct FormatRegistry {
    /// 解复用器工厂映射
    demuxers: HashMap<FormatId, DemuxerEntry>,
    /// 格式探测器列表
    probes: Vec<Box<dyn FormatProbe>>,
}

/// 解复用器注册条目
struct DemuxerEntry {
    /// 格式名称
    name: String,
    /// 工厂函数
    factory: DemuxerFactory,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            demuxers: HashMap::new(),
            probes: Vec::new(),
        }
    }

    /// 注册一个解复用器
    pub fn register_demuxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: DemuxerFactory,
    ) {
        self.demuxers.insert(
            format_id,
            DemuxerEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 注册一个格式探测器
    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe>) {
        self.probes.push(probe);
    }

    /// 创建指定格式的解复用器实例
    pub fn create_demuxer(&self, format_id: FormatId) -> VioletResult<Box<dyn Demuxer>> {
        let entry = self.demuxers.get(&format_id).ok_or_else(|| {
            VioletError::FormatNotFound(format!("未找到 {} 的解复用器", format_id))
        })?;
        (entry.factory)()
    }

    /// 探测数据的容器格式
    ///
    /// 遍历所有已注册的探测器, 返回置信度最高的结果.
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                let is_better = best.as_ref().is_none_or(|b| score > b.score);
                if is_better {
                    best = Some(ProbeResult {
                        format_id: probe.format_id(),
                        score,
                    });
                }
            }
        }
        best
    }

    /// 获取所有已注册的解复用器名称
    pub fn list_demuxers(&self) -> Vec<(FormatId, &str)> {
        self.demuxers
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str()))
            .collect()
    }

    /// 探测输入格式 (不打开解复用器)
    ///
    /// 读取头部数据探测格式, 然后 seek 回起始位置.
    pub fn probe_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> VioletResult<ProbeResult> {
        let probe_size = io.size().map_or(PROBE_SIZE, |s| (s as usize).min(PROBE_SIZE));
        let mut probe_buf = vec![0u8; probe_size];
        let n = io.read_up_to(&mut probe_buf)?;
        probe_buf.truncate(n);

        let result = self
            .probe(&probe_buf, filename)
            .ok_or_else(|| VioletError::FormatNotFound("无法识别输入格式".to_string()))?;

        io.seek(std::io::SeekFrom::Start(0))?;
        debug!("探测到格式 {} (置信度 {})", result.format_id, result.score);
        Ok(result)
    }

    /// 自动探测格式, 创建解复用器并解析头部
    pub fn open_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> VioletResult<Box<dyn Demuxer>> {
        self.open_input_with_options(io, filename, &[])
    }

    /// 同 `open_input`, 并在解析头部之前逐个应用容器选项
    ///
    /// 被拒绝的选项记录警告后丢弃, 不影响打开.
    pub fn open_input_with_options(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
        options: &[(String, String)],
    ) -> VioletResult<Box<dyn Demuxer>> {
        let result = self.probe_input(io, filename)?;
        let mut demuxer = self.create_demuxer(result.format_id)?;
        for (key, value) in options {
            if let Err(e) = demuxer.set_option(key, value) {
                warn!("丢弃无效的容器选项 {}={}: {}", key, value, e);
            }
        }
        demuxer.open(io)?;
        Ok(demuxer)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
