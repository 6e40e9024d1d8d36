//! 统一错误类型定义.
//!
//! 所有 Violet crate 共用的错误类型. 前六个变体面向会话调用方
//! (打开、选流、解码、跳转), 其余变体在解码器/解复用器内部流转.

use thiserror::Error;

/// Violet 统一错误类型
#[derive(Debug, Error)]
pub enum VioletError {
    // ========================
    // 会话级错误
    // ========================
    /// 输入为空或不可用 (空路径、空回调等)
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 资源分配失败 (缓冲区、上下文)
    #[error("资源耗尽: {0}")]
    ResourceExhausted(String),

    /// 容器无法打开或无法解析
    #[error("打开失败: {0}")]
    OpenFailed(String),

    /// 没有可用的音频/视频流
    #[error("未找到可用流: {0}")]
    StreamNotFound(String),

    /// 解码或转换失败
    #[error("解码失败: {0}")]
    DecodeFailed(String),

    /// 跳转被拒绝或底层跳转失败
    #[error("跳转失败: {0}")]
    SeekFailed(String),

    // ========================
    // 组件内部错误
    // ========================
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 容器格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Violet 统一 Result 类型
pub type VioletResult<T> = Result<T, VioletError>;
