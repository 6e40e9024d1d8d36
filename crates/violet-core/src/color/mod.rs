//! 色彩相关类型定义.

mod chroma_location;
mod color_range;

pub use chroma_location::ChromaLocation;
pub use color_range::ColorRange;
