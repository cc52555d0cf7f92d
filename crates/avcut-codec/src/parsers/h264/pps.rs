//! H.264 PPS (Picture Parameter Set) 解析器.
//!
//! PPS 通过 sps_id 引用已解析的 SPS, 只保存 ID, 使用时再到表中查找.
//!
//! 必选字段之后可能还有 transform_8x8_mode_flag 与量化矩阵组成的可选尾部.
//! 是否存在由 more_rbsp_data() 决定: 先在读取器的副本上检查 rbsp_trailing_bits,
//! 合法则没有尾部, 否则在原读取器上读取尾部并再次校验.
//!
//! 标准码流在量化矩阵之后还有 second_chroma_qp_index_offset; 部分封装省略该字段.
//! 量化矩阵之后同样先试探 rbsp_trailing_bits, 合法即结束, 否则再跳过这个 se(v).
//! 两种写法不会混淆: se(v) 之后紧跟终止位时, 剩余位不可能恰好是一个 1 加全 0.

use avcut_core::bitreader::BitReader;
use avcut_core::{AvcError, AvcResult};

use super::exp_golomb::{read_ue, skip_se, skip_ue};
use super::store::ParameterSetStore;
use super::syntax::{ceil_log2, rbsp_trailing_bits_valid, skip_scaling_matrix};

/// PPS 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pps {
    /// PPS ID (pic_parameter_set_id)
    pub pps_id: u32,
    /// 引用的 SPS ID, 解析时已确认存在
    pub sps_id: u32,
    /// 熵编码模式 (false=CAVLC, true=CABAC)
    pub entropy_coding_mode_flag: bool,
    /// bottom_field_pic_order_in_frame_present_flag
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    /// num_slice_groups_minus1
    pub num_slice_groups_minus1: u32,
    /// slice_group_map_type (仅 num_slice_groups_minus1 > 0)
    pub slice_group_map_type: u32,
    /// slice_group_change_rate_minus1 + 1 (仅 map type 3..=5)
    pub slice_group_change_rate: u32,
    /// 默认参考索引数 [L0, L1] (num_ref_idx_lX_default_active_minus1 + 1)
    pub num_ref_idx: [u32; 2],
    /// weighted_pred_flag (P/SP 加权预测)
    pub weighted_pred_flag: bool,
    /// weighted_bipred_idc (B 加权预测模式, 0-2)
    pub weighted_bipred_idc: u32,
    /// deblocking_filter_control_present_flag
    pub deblocking_filter_control_present_flag: bool,
    /// redundant_pic_cnt_present_flag
    pub redundant_pic_cnt_present_flag: bool,
    /// transform_8x8_mode_flag (可选尾部, 不存在时为 false)
    pub transform_8x8_mode_flag: bool,
}

impl Pps {
    /// 是否使用 CABAC
    pub fn is_cabac(&self) -> bool {
        self.entropy_coding_mode_flag
    }

    /// 是否有 slice_group_change_cycle 字段 (多 slice group 且 map type 为 3..=5)
    pub fn has_slice_group_change_cycle(&self) -> bool {
        self.num_slice_groups_minus1 > 0 && (3..=5).contains(&self.slice_group_map_type)
    }
}

/// 解析 PPS RBSP (不含 NAL 头部字节) 并写入存储, 返回 pps_id
///
/// 引用的 SPS 不存在, ID 越界, 必选字段溢出或 trailing bits 无效时返回 [`AvcError::BadData`].
pub fn parse_pps(rbsp: &[u8], store: &mut ParameterSetStore) -> AvcResult<u32> {
    let mut br = BitReader::new(rbsp);

    let pps_id = read_ue(&mut br);
    store.pps.reset_slot(pps_id)?;

    let sps_id = read_ue(&mut br);
    let Some(sps) = store.sps.get(sps_id) else {
        return Err(AvcError::BadData(format!(
            "H264: PPS 引用的 SPS 不存在, pps_id={}, sps_id={}",
            pps_id, sps_id
        )));
    };
    let chroma_format_idc = sps.chroma_format_idc;

    let mut pps = Pps {
        pps_id,
        sps_id,
        ..Pps::default()
    };

    pps.entropy_coding_mode_flag = br.read_bit() == 1;
    pps.bottom_field_pic_order_in_frame_present_flag = br.read_bit() == 1;
    pps.num_slice_groups_minus1 = read_ue(&mut br);
    if pps.num_slice_groups_minus1 > 0 {
        skip_slice_group_map(&mut br, &mut pps);
    }

    pps.num_ref_idx[0] = read_ue(&mut br).saturating_add(1);
    pps.num_ref_idx[1] = read_ue(&mut br).saturating_add(1);
    pps.weighted_pred_flag = br.read_bit() == 1;
    pps.weighted_bipred_idc = br.read_bits(2);
    skip_se(&mut br); // pic_init_qp_minus26
    skip_se(&mut br); // pic_init_qs_minus26
    skip_se(&mut br); // chroma_qp_index_offset
    pps.deblocking_filter_control_present_flag = br.read_bit() == 1;
    br.skip_bits(1); // constrained_intra_pred_flag
    pps.redundant_pic_cnt_present_flag = br.read_bit() == 1;

    if br.is_eof() {
        return Err(AvcError::BadData(format!(
            "H264: PPS 数据溢出, pps_id={}",
            pps_id
        )));
    }

    // !more_rbsp_data(): 在副本上试探, 不消耗原读取器
    let mut lookahead = br.clone();
    if !rbsp_trailing_bits_valid(&mut lookahead) {
        pps.transform_8x8_mode_flag = br.read_bit() == 1;
        let pic_scaling_matrix_present = br.read_bit() == 1;
        if pic_scaling_matrix_present {
            let per_8x8 = if chroma_format_idc != 3 { 2 } else { 6 };
            let count = 6 + per_8x8 * usize::from(pps.transform_8x8_mode_flag);
            skip_scaling_matrix(&mut br, count);
        }
        let mut lookahead = br.clone();
        if !rbsp_trailing_bits_valid(&mut lookahead) {
            skip_se(&mut br); // second_chroma_qp_index_offset
        }

        if !rbsp_trailing_bits_valid(&mut br) {
            return Err(AvcError::BadData(format!(
                "H264: PPS rbsp_trailing_bits 无效, pps_id={}",
                pps_id
            )));
        }
    }

    store.pps.fill_slot(pps_id, pps);
    Ok(pps_id)
}

fn skip_slice_group_map(br: &mut BitReader, pps: &mut Pps) {
    pps.slice_group_map_type = read_ue(br);
    match pps.slice_group_map_type {
        0 => {
            for _ in 0..=pps.num_slice_groups_minus1 {
                if br.is_eof() {
                    break;
                }
                skip_ue(br); // run_length_minus1
            }
        }
        2 => {
            for _ in 0..pps.num_slice_groups_minus1 {
                if br.is_eof() {
                    break;
                }
                skip_ue(br); // top_left
                skip_ue(br); // bottom_right
            }
        }
        3..=5 => {
            br.skip_bits(1); // slice_group_change_direction_flag
            pps.slice_group_change_rate = read_ue(br).saturating_add(1);
        }
        6 => {
            let pic_size_in_map_units_minus1 = read_ue(br);
            let id_bits = ceil_log2(u64::from(pps.num_slice_groups_minus1) + 1);
            for _ in 0..=pic_size_in_map_units_minus1 {
                if br.is_eof() {
                    break;
                }
                br.skip_bits(id_bits); // slice_group_id
            }
        }
        _ => {}
    }
}
