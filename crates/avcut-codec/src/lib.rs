//! # avcut-codec
//!
//! H.264 码流解析库, 为视频剪切与转封装提供参数集与 slice header 信息.
//!
//! ## 使用示例
//!
//! ```rust
//! use avcut_codec::parsers::h264::AvcParseContext;
//!
//! let mut ctx = AvcParseContext::new();
//! // 配置记录头部之后缺少 SPS 个数字段
//! assert!(ctx.parse_extra_data(&[0x01, 0x64, 0x00, 0x1F, 0xFF]).is_err());
//! assert_eq!(ctx.sps_count(), 0);
//! ```

pub mod parsers;

pub use parsers::h264::{AvcParseContext, SliceHeaderInfo, SliceType};
