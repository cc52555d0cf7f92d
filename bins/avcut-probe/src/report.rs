//! 探测结果收集与输出.
//!
//! 把配置记录与样本交给 [`AvcParseContext`] 解析, 汇总成可序列化的报告.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::Serialize;

use avcut_codec::parsers::h264::{
    AvcParseContext, ConfigRecordHeader, NalHeader, NalUnitType, ParameterSetId, Pps, Sps,
    split_length_prefixed,
};

// ============================================================
// 报告结构体
// ============================================================

/// 完整探测结果
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub config: ConfigInfo,
    pub sps: Vec<SpsInfo>,
    pub pps: Vec<PpsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleReport>,
}

/// 配置记录头部
#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub configuration_version: u8,
    pub profile: u8,
    pub profile_compatibility: u8,
    pub level: u8,
    pub nal_length_size: usize,
}

/// SPS 摘要
#[derive(Debug, Serialize)]
pub struct SpsInfo {
    pub sps_id: u32,
    pub profile_idc: u8,
    pub level_idc: u8,
    pub chroma_format_idc: u32,
    pub width: u64,
    pub height: u64,
    pub frame_mbs_only: bool,
    pub log2_max_frame_num: u32,
    pub pic_order_cnt_type: u32,
}

/// PPS 摘要
#[derive(Debug, Serialize)]
pub struct PpsInfo {
    pub pps_id: u32,
    pub sps_id: u32,
    pub entropy_coding: &'static str,
    pub num_slice_groups: u64,
    pub num_ref_idx_l0: u32,
    pub num_ref_idx_l1: u32,
    pub weighted_pred: bool,
    pub weighted_bipred_idc: u32,
    pub deblocking_filter_control: bool,
}

/// 样本解析结果
#[derive(Debug, Serialize)]
pub struct SampleReport {
    pub length_size: usize,
    pub units: Vec<NalReport>,
    /// 末尾无法按长度前缀切分的字节数
    pub trailing_bytes: usize,
}

/// 单个 NAL 单元
#[derive(Debug, Serialize)]
pub struct NalReport {
    pub index: usize,
    /// NAL 数据 (不含长度前缀) 在样本中的偏移
    pub offset: usize,
    pub size: usize,
    pub nal_type: u8,
    pub nal_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<SliceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// slice header 信息
#[derive(Debug, Serialize)]
pub struct SliceReport {
    pub slice_type: String,
    pub pps_id: u32,
    pub nal_ref_idc: u8,
    pub header_size: usize,
    pub escape_bytes: usize,
}

impl From<&ConfigRecordHeader> for ConfigInfo {
    fn from(header: &ConfigRecordHeader) -> Self {
        Self {
            configuration_version: header.configuration_version,
            profile: header.profile_indication,
            profile_compatibility: header.profile_compatibility,
            level: header.level_indication,
            nal_length_size: header.nal_length_size,
        }
    }
}

impl From<&Sps> for SpsInfo {
    fn from(sps: &Sps) -> Self {
        Self {
            sps_id: sps.sps_id,
            profile_idc: sps.profile_idc,
            level_idc: sps.level_idc,
            chroma_format_idc: sps.chroma_format_idc,
            width: sps.width_in_luma_samples(),
            height: sps.height_in_luma_samples(),
            frame_mbs_only: sps.frame_mbs_only_flag,
            log2_max_frame_num: sps.log2_max_frame_num,
            pic_order_cnt_type: sps.pic_order_cnt_type,
        }
    }
}

impl From<&Pps> for PpsInfo {
    fn from(pps: &Pps) -> Self {
        Self {
            pps_id: pps.pps_id,
            sps_id: pps.sps_id,
            entropy_coding: if pps.is_cabac() { "CABAC" } else { "CAVLC" },
            num_slice_groups: u64::from(pps.num_slice_groups_minus1) + 1,
            num_ref_idx_l0: pps.num_ref_idx[0],
            num_ref_idx_l1: pps.num_ref_idx[1],
            weighted_pred: pps.weighted_pred_flag,
            weighted_bipred_idc: pps.weighted_bipred_idc,
            deblocking_filter_control: pps.deblocking_filter_control_present_flag,
        }
    }
}

// ============================================================
// 探测逻辑
// ============================================================

fn is_slice_nal(nal_type: NalUnitType) -> bool {
    matches!(
        nal_type,
        NalUnitType::Slice
            | NalUnitType::SliceIdr
            | NalUnitType::SliceExtension
            | NalUnitType::SliceExtensionDepth
    )
}

/// 解析配置记录和 (可选的) 样本数据
///
/// `length_size` 为 `None` 时使用配置记录中的 NAL 长度字段大小.
/// 配置记录无效时返回错误; 样本中单个 NAL 的错误只记录在报告里.
pub fn probe(
    config: &[u8],
    sample: Option<&[u8]>,
    length_size: Option<usize>,
) -> Result<ProbeReport> {
    let mut ctx = AvcParseContext::new();
    let header = ctx.parse_extra_data(config).context("解析配置记录失败")?;
    info!(
        "配置记录: profile={}, level={}, sps={}, pps={}",
        header.profile_indication,
        header.level_indication,
        ctx.sps_count(),
        ctx.pps_count()
    );

    let length_size = length_size.unwrap_or(header.nal_length_size);
    if !(1..=4).contains(&length_size) {
        bail!("NAL 长度字段大小无效, length_size={length_size}");
    }

    let sample = sample.map(|data| probe_sample(&mut ctx, data, length_size));

    Ok(ProbeReport {
        config: ConfigInfo::from(&header),
        sps: ctx.sps_iter().map(|(_, sps)| SpsInfo::from(sps)).collect(),
        pps: ctx.pps_iter().map(|(_, pps)| PpsInfo::from(pps)).collect(),
        sample,
    })
}

fn probe_sample(ctx: &mut AvcParseContext, data: &[u8], length_size: usize) -> SampleReport {
    let mut units = Vec::new();
    let mut end = 0usize;

    for (index, nal) in split_length_prefixed(data, length_size).enumerate() {
        let offset = end + length_size;
        end = offset + nal.len();
        units.push(probe_nal(ctx, index, offset, nal));
    }

    let trailing_bytes = data.len() - end;
    debug!(
        "样本切分完成, nal_count={}, trailing_bytes={}",
        units.len(),
        trailing_bytes
    );

    SampleReport {
        length_size,
        units,
        trailing_bytes,
    }
}

fn probe_nal(ctx: &mut AvcParseContext, index: usize, offset: usize, nal: &[u8]) -> NalReport {
    let mut report = NalReport {
        index,
        offset,
        size: nal.len(),
        nal_type: 0,
        nal_type_name: String::new(),
        parameter_set: None,
        slice: None,
        error: None,
    };

    let header = match NalHeader::parse(nal) {
        Ok(header) => header,
        Err(err) => {
            report.error = Some(err.to_string());
            return report;
        }
    };
    report.nal_type = header.nal_type.type_id();
    report.nal_type_name = header.nal_type.to_string();

    match header.nal_type {
        NalUnitType::Sps | NalUnitType::Pps => match ctx.parse_parameter_set_nal(nal) {
            Ok(Some(ParameterSetId::Sps(id))) => report.parameter_set = Some(format!("SPS #{id}")),
            Ok(Some(ParameterSetId::Pps(id))) => report.parameter_set = Some(format!("PPS #{id}")),
            Ok(None) => {}
            Err(err) => report.error = Some(err.to_string()),
        },
        nal_type if is_slice_nal(nal_type) => match ctx.slice_header_info(nal) {
            Ok(info) => {
                report.slice = Some(SliceReport {
                    slice_type: info.slice_type.to_string(),
                    pps_id: info.pps_id,
                    nal_ref_idc: info.nal_ref_idc,
                    header_size: info.header_size,
                    escape_bytes: info.escape_bytes,
                })
            }
            Err(err) => report.error = Some(err.to_string()),
        },
        _ => {}
    }

    report
}

/// 读取文件并探测
pub fn probe_files(
    config_path: &Path,
    sample_path: Option<&Path>,
    length_size: Option<usize>,
) -> Result<ProbeReport> {
    let config = std::fs::read(config_path)
        .with_context(|| format!("读取配置记录失败, path={}", config_path.display()))?;
    let sample = match sample_path {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("读取样本失败, path={}", path.display()))?,
        ),
        None => None,
    };
    probe(&config, sample.as_deref(), length_size)
}

// ============================================================
// 文本输出
// ============================================================

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(
            f,
            "配置记录: version={}, profile={}, compat=0x{:02X}, level={}, nal_length_size={}",
            c.configuration_version, c.profile, c.profile_compatibility, c.level, c.nal_length_size
        )?;

        for sps in &self.sps {
            writeln!(
                f,
                "  SPS #{}: profile={}, level={}, chroma={}, {}x{}, frame_mbs_only={}, poc={}",
                sps.sps_id,
                sps.profile_idc,
                sps.level_idc,
                sps.chroma_format_idc,
                sps.width,
                sps.height,
                sps.frame_mbs_only,
                sps.pic_order_cnt_type
            )?;
        }
        for pps in &self.pps {
            writeln!(
                f,
                "  PPS #{}: sps={}, {}, slice_groups={}, ref_idx={}/{}, weighted={}/{}",
                pps.pps_id,
                pps.sps_id,
                pps.entropy_coding,
                pps.num_slice_groups,
                pps.num_ref_idx_l0,
                pps.num_ref_idx_l1,
                pps.weighted_pred,
                pps.weighted_bipred_idc
            )?;
        }

        let Some(sample) = &self.sample else {
            return Ok(());
        };
        writeln!(
            f,
            "样本: {} 个 NAL, length_size={}",
            sample.units.len(),
            sample.length_size
        )?;
        for unit in &sample.units {
            write!(
                f,
                "  [{}] offset={} size={} {}",
                unit.index, unit.offset, unit.size, unit.nal_type_name
            )?;
            if let Some(ps) = &unit.parameter_set {
                write!(f, " -> {ps}")?;
            }
            if let Some(slice) = &unit.slice {
                write!(
                    f,
                    " slice_type={} pps={} header_size={} escape_bytes={}",
                    slice.slice_type, slice.pps_id, slice.header_size, slice.escape_bytes
                )?;
            }
            if let Some(err) = &unit.error {
                write!(f, " 错误: {err}")?;
            }
            writeln!(f)?;
        }
        if sample.trailing_bytes > 0 {
            writeln!(f, "  末尾 {} 字节无法切分", sample.trailing_bytes)?;
        }
        Ok(())
    }
}
