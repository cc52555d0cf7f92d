//! # avcut-core
//!
//! avcut 核心库, 提供按位读写与错误处理等基础设施.
//!
//! 上层 H.264 解析逻辑 (`avcut-codec`) 只通过 [`BitReader`] 的窄接口读取码流.

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{AvcError, AvcResult};
