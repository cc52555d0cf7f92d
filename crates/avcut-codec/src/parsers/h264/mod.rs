//! H.264/AVC 码流解析器.
//!
//! 面向转封装/剪切场景, 不解码图像, 只提供:
//! - NAL 单元类型识别与 AVCC 样本切分
//! - Exp-Golomb 读取与 emulation prevention 字节处理
//! - SPS / PPS 中计算 slice header 所需字段的解析
//! - avcC 配置记录解析
//! - slice header 字节长度计算

pub mod config_record;
pub mod context;
pub mod emulation;
pub mod exp_golomb;
pub mod nal;
pub mod pps;
pub mod slice_header;
pub mod sps;
pub mod store;
pub mod syntax;

pub use config_record::{ConfigRecordHeader, ParameterSetId, parse_config_record};
pub use context::AvcParseContext;
pub use nal::{NalHeader, NalUnitType, split_length_prefixed};
pub use pps::{Pps, parse_pps};
pub use slice_header::{SliceHeaderInfo, SliceType, parse_slice_header};
pub use sps::{Sps, parse_sps};
pub use store::{MAX_PPS_COUNT, MAX_SPS_COUNT, ParameterSetStore};
