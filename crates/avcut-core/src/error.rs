//! 统一错误类型定义.
//!
//! 解析失败对当前处理单元是终止性的, 调用方拿到错误种类和描述 (阶段、id 等) 后自行记录日志.

use thiserror::Error;

/// avcut 统一错误类型
#[derive(Debug, Error)]
pub enum AvcError {
    /// 无效数据 (id 越界、引用不存在、尾随位非法、码流溢出等)
    #[error("无效数据: {0}")]
    BadData(String),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    AllocationFailed(String),
}

impl AvcError {
    /// 是否为 [`AvcError::BadData`]
    pub fn is_bad_data(&self) -> bool {
        matches!(self, Self::BadData(_))
    }
}

/// avcut 统一 Result 类型
pub type AvcResult<T> = Result<T, AvcError>;
