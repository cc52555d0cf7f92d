//! AVCDecoderConfigurationRecord (MP4 avcC box 内容) 解析.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ version(8) profile(8) compat(8) level(8) 111111 length_size-1(2) │
//! ├──────────────────────────────────────────────────────────────┤
//! │ 111 num_sps(5) │ { len(16) nal_header(8) rbsp(len-1) } * num_sps │
//! ├──────────────────────────────────────────────────────────────┤
//! │ num_pps(8)     │ { len(16) nal_header(8) rbsp(len-1) } * num_pps │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! 两个参数集块结构相同, 单元数都只取低 5 位. 任一单元出错即终止整个记录的解析,
//! 因为之后的偏移已经不可信.

use log::debug;

use avcut_core::{AvcError, AvcResult};

use super::emulation;
use super::nal::NalUnitType;
use super::pps::parse_pps;
use super::sps::parse_sps;
use super::store::ParameterSetStore;

/// 配置记录固定头部长度
pub const CONFIG_RECORD_HEADER_SIZE: usize = 5;

/// 配置记录固定头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRecordHeader {
    /// configurationVersion
    pub configuration_version: u8,
    /// AVCProfileIndication
    pub profile_indication: u8,
    /// profile_compatibility
    pub profile_compatibility: u8,
    /// AVCLevelIndication
    pub level_indication: u8,
    /// 样本中 NAL 长度前缀的字节数 (lengthSizeMinusOne + 1, 1-4)
    pub nal_length_size: usize,
}

impl ConfigRecordHeader {
    /// 解析固定头部, 不校验字段取值
    pub fn parse(data: &[u8]) -> AvcResult<Self> {
        if data.len() < CONFIG_RECORD_HEADER_SIZE {
            return Err(AvcError::BadData(format!(
                "H264: avcC 数据太短, len={}",
                data.len()
            )));
        }
        Ok(Self {
            configuration_version: data[0],
            profile_indication: data[1],
            profile_compatibility: data[2],
            level_indication: data[3],
            nal_length_size: usize::from(data[4] & 0x03) + 1,
        })
    }
}

/// 已注册的参数集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSetId {
    /// SPS, 携带 sps_id
    Sps(u32),
    /// PPS, 携带 pps_id
    Pps(u32),
}

/// 去除防竞争字节后按 NAL 类型分派给 SPS/PPS 解析器
///
/// `payload` 为 NAL 头部之后的原始载荷. 其他类型不解析, 返回 `Ok(None)`.
pub fn register_parameter_set(
    nal_type: NalUnitType,
    payload: &[u8],
    store: &mut ParameterSetStore,
) -> AvcResult<Option<ParameterSetId>> {
    let rbsp = emulation::decode(payload)?;
    match nal_type {
        NalUnitType::Sps => {
            let sps_id = parse_sps(&rbsp, &mut store.sps)?;
            debug!("H264: SPS 已注册, sps_id={}, size={}", sps_id, payload.len());
            Ok(Some(ParameterSetId::Sps(sps_id)))
        }
        NalUnitType::Pps => {
            let pps_id = parse_pps(&rbsp, store)?;
            debug!("H264: PPS 已注册, pps_id={}, size={}", pps_id, payload.len());
            Ok(Some(ParameterSetId::Pps(pps_id)))
        }
        _ => Ok(None),
    }
}

/// 解析配置记录, 注册其中的 SPS/PPS, 返回固定头部
pub fn parse_config_record(
    data: &[u8],
    store: &mut ParameterSetStore,
) -> AvcResult<ConfigRecordHeader> {
    let header = ConfigRecordHeader::parse(data)?;
    let mut pos = CONFIG_RECORD_HEADER_SIZE;

    for block in ["SPS", "PPS"] {
        let Some(&count_byte) = data.get(pos) else {
            return Err(AvcError::BadData(format!(
                "H264: avcC 缺少 {} 个数字段, pos={}",
                block, pos
            )));
        };
        pos += 1;

        let unit_count = count_byte & 0x1F;
        for index in 0..unit_count {
            let Some(size_bytes) = data.get(pos..pos + 2) else {
                return Err(AvcError::BadData(format!(
                    "H264: avcC {} 长度字段截断, index={}",
                    block, index
                )));
            };
            let unit_size = usize::from(u16::from_be_bytes([size_bytes[0], size_bytes[1]]));
            pos += 2;

            let remain = data.len() - pos;
            if unit_size > remain {
                return Err(AvcError::BadData(format!(
                    "H264: avcC {} 数据截断, index={}, declared_len={}, remain={}",
                    block, index, unit_size, remain
                )));
            }
            if unit_size <= 1 {
                return Err(AvcError::BadData(format!(
                    "H264: avcC {} 单元为空, index={}, len={}",
                    block, index, unit_size
                )));
            }

            let nal_type = NalUnitType::from_type_id(data[pos]);
            let payload = &data[pos + 1..pos + unit_size];
            register_parameter_set(nal_type, payload, store)?;
            pos += unit_size;
        }
    }

    Ok(header)
}
