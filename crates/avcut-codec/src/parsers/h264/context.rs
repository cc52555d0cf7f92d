//! 解析上下文: 一路 H.264 基本流对应一个实例.
//!
//! 上下文持有 SPS/PPS 表, 所有参数集随上下文一起释放. 不同码流必须使用不同的上下文;
//! 同一上下文内只要求 SPS 先于引用它的 PPS 注册, PPS 先于引用它的 slice 注册.

use log::{debug, warn};

use avcut_core::{AvcError, AvcResult};

use super::config_record::{self, ConfigRecordHeader, ParameterSetId};
use super::nal::NalHeader;
use super::pps::Pps;
use super::slice_header::{self, SliceHeaderInfo};
use super::sps::Sps;
use super::store::ParameterSetStore;

/// H.264 解析上下文
#[derive(Debug, Clone, Default)]
pub struct AvcParseContext {
    store: ParameterSetStore,
}

impl AvcParseContext {
    /// 创建空上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析配置记录 (avcC), 注册其中的全部 SPS/PPS
    ///
    /// 任一单元失败即返回错误, 之前已注册的参数集保留.
    pub fn parse_extra_data(&mut self, data: &[u8]) -> AvcResult<ConfigRecordHeader> {
        match config_record::parse_config_record(data, &mut self.store) {
            Ok(header) => {
                debug!(
                    "H264: avcC 解析完成, profile={}, level={}, nal_length_size={}, sps={}, pps={}",
                    header.profile_indication,
                    header.level_indication,
                    header.nal_length_size,
                    self.store.sps.len(),
                    self.store.pps.len()
                );
                Ok(header)
            }
            Err(err) => {
                warn!("H264: avcC 解析失败, err={}", err);
                Err(err)
            }
        }
    }

    /// 注册单个 SPS/PPS NAL 单元 (含头部字节), 如样本中带内传输的参数集
    ///
    /// 其他类型的 NAL 不解析, 返回 `Ok(None)`.
    pub fn parse_parameter_set_nal(&mut self, nal: &[u8]) -> AvcResult<Option<ParameterSetId>> {
        let header = NalHeader::parse(nal)?;
        config_record::register_parameter_set(header.nal_type, &nal[1..], &mut self.store)
            .inspect_err(|err| warn!("H264: 忽略无效的 {}, err={}", header.nal_type, err))
    }

    /// 计算 slice header 长度并返回解析到的 header 信息
    ///
    /// `nal` 为完整的 slice NAL 单元 (含头部字节).
    pub fn slice_header_info(&self, nal: &[u8]) -> AvcResult<SliceHeaderInfo> {
        if nal.is_empty() {
            return Err(AvcError::BadData("H264: slice NAL 数据为空".into()));
        }

        match slice_header::parse_slice_header(nal, &self.store) {
            Ok(info) => {
                debug!(
                    "H264: slice, type={}, slice_type={}, pps_id={}, size={}, escape_bytes={}",
                    info.nal_unit_type,
                    info.slice_type,
                    info.pps_id,
                    info.header_size,
                    info.escape_bytes
                );
                Ok(info)
            }
            Err(err) => {
                warn!("H264: slice header 解析失败, size={}, err={}", nal.len(), err);
                Err(err)
            }
        }
    }

    /// 计算 slice header 在原始 NAL 中的字节数 (含防竞争字节)
    pub fn slice_header_size(&self, nal: &[u8]) -> AvcResult<usize> {
        self.slice_header_info(nal).map(|info| info.header_size)
    }

    /// 按 ID 查找 SPS
    pub fn sps(&self, sps_id: u32) -> Option<&Sps> {
        self.store.sps.get(sps_id)
    }

    /// 按 ID 查找 PPS
    pub fn pps(&self, pps_id: u32) -> Option<&Pps> {
        self.store.pps.get(pps_id)
    }

    /// PPS 引用的 SPS
    pub fn sps_for_pps(&self, pps_id: u32) -> Option<&Sps> {
        self.pps(pps_id).and_then(|pps| self.sps(pps.sps_id))
    }

    /// 已注册的 SPS 个数
    pub fn sps_count(&self) -> usize {
        self.store.sps.len()
    }

    /// 已注册的 PPS 个数
    pub fn pps_count(&self) -> usize {
        self.store.pps.len()
    }

    /// 按 ID 升序遍历 SPS
    pub fn sps_iter(&self) -> impl Iterator<Item = (u32, &Sps)> {
        self.store.sps.iter()
    }

    /// 按 ID 升序遍历 PPS
    pub fn pps_iter(&self) -> impl Iterator<Item = (u32, &Pps)> {
        self.store.pps.iter()
    }

    /// 底层参数集存储
    pub fn store(&self) -> &ParameterSetStore {
        &self.store
    }
}
