//! # avcut
//!
//! H.264 码流剪切辅助库.
//!
//! 在不解码图像的前提下, 从 avcC 配置记录和带内 NAL 单元中解析 SPS/PPS,
//! 并计算 slice header 在原始 NAL 中占用的字节数 (含 emulation prevention 字节),
//! 供剪切/转封装流程定位 slice data 的起始位置.
//!
//! # 快速开始
//!
//! ```rust
//! use avcut::codec::parsers::h264::AvcParseContext;
//!
//! let mut ctx = AvcParseContext::new();
//! // 只有头部, 没有 SPS 个数字段
//! let err = ctx.parse_extra_data(&[0x01, 0x42, 0xC0, 0x1E, 0xFF]).unwrap_err();
//! assert!(err.is_bad_data());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `avcut-core` | 比特流读写器与错误类型 |
//! | `avcut-codec` | H.264 参数集与 slice header 解析 |

/// 比特流读写与错误类型
pub use avcut_core as core;

/// H.264 码流解析
pub use avcut_codec as codec;

/// 获取 avcut 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
