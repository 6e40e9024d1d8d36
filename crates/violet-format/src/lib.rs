//! # violet-format
//!
//! Violet 容器解复用框架: 解复用器契约、格式探测、注册表与 I/O 抽象.
//!
//! 管线只依赖 `Demuxer` trait 的契约 (流列表、按存储顺序读包、
//! 向后关键帧定位、容器起始时间与时长). 内置 WAV 与 AVI 解复用器.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod io;
pub mod probe;
pub mod registry;
pub mod stream;

// 重导出常用类型
pub use demuxer::{Demuxer, SeekFlags};
pub use format_id::FormatId;
pub use io::IoContext;
pub use probe::ProbeResult;
pub use registry::FormatRegistry;
pub use stream::{Disposition, Stream};

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
}
