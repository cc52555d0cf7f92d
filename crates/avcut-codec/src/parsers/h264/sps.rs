//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 只保留计算 slice header 长度所需的字段:
//! - 色度格式与 separate_colour_plane (决定 colour_plane_id 与加权表色度部分)
//! - frame_num / POC 相关位宽与 POC 类型
//! - 宏块为单位的图像尺寸与 frame_mbs_only (决定 field_pic_flag 与 slice group 周期位宽)
//!
//! 其余字段 (位深, 量化矩阵, cropping, VUI) 只按位跳过, 用于保证 rbsp_trailing_bits 校验位置正确.

use avcut_core::bitreader::BitReader;
use avcut_core::{AvcError, AvcResult};

use super::exp_golomb::{read_ue, skip_se, skip_ue};
use super::store::ParameterSetTable;
use super::syntax::{rbsp_trailing_bits_valid, skip_scaling_matrix};

/// 扩展 SAR 标记 (aspect_ratio_idc)
const EXTENDED_SAR: u32 = 255;

/// 携带 chroma_format_idc / 位深 / 量化矩阵字段的 profile
const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// SPS 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sps {
    /// SPS ID (seq_parameter_set_id)
    pub sps_id: u32,
    /// profile_idc (编码规格, 如 66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位与保留位
    pub constraint_set_flags: u8,
    /// level_idc (编码级别, 如 30=3.0, 41=4.1)
    pub level_idc: u8,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// ChromaArrayType: separate_colour_plane 时为 0, 否则等于 chroma_format_idc
    pub chroma_array_type: u32,
    /// separate_colour_plane_flag (仅 4:4:4)
    pub separate_colour_plane_flag: bool,
    /// log2(max_frame_num) = log2_max_frame_num_minus4 + 4
    pub log2_max_frame_num: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub pic_order_cnt_type: u32,
    /// log2(max_pic_order_cnt_lsb) = log2_max_pic_order_cnt_lsb_minus4 + 4 (仅 pic_order_cnt_type==0)
    pub log2_max_pic_order_cnt_lsb: u32,
    /// delta_pic_order_always_zero_flag (仅 pic_order_cnt_type==1)
    pub delta_pic_order_always_zero_flag: bool,
    /// pic_width_in_mbs_minus1 + 1
    pub pic_width_in_mbs: u32,
    /// pic_height_in_map_units_minus1 + 1
    pub pic_height_in_map_units: u32,
    /// 是否为帧编码 (无场编码)
    pub frame_mbs_only_flag: bool,
}

impl Sps {
    /// PicSizeInMapUnits, 用 64 位避免乘法溢出
    pub fn pic_size_in_map_units(&self) -> u64 {
        u64::from(self.pic_width_in_mbs) * u64::from(self.pic_height_in_map_units)
    }

    /// FrameHeightInMbs: 场编码时一个 map unit 对应两行宏块
    pub fn frame_height_in_mbs(&self) -> u64 {
        let factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        factor * u64::from(self.pic_height_in_map_units)
    }

    /// 亮度宽度 (像素, 未应用 cropping)
    pub fn width_in_luma_samples(&self) -> u64 {
        u64::from(self.pic_width_in_mbs) * 16
    }

    /// 亮度高度 (像素, 未应用 cropping)
    pub fn height_in_luma_samples(&self) -> u64 {
        self.frame_height_in_mbs() * 16
    }
}

/// 判断 profile 是否带有 High 系列扩展字段
pub fn is_high_profile(profile_idc: u8) -> bool {
    HIGH_PROFILES.contains(&profile_idc)
}

/// 解析 SPS RBSP (不含 NAL 头部字节) 并写入表中, 返回 sps_id
///
/// ID 越界, rbsp_trailing_bits 无效时返回 [`AvcError::BadData`];
/// 失败时对应槽位保持为空.
pub fn parse_sps(rbsp: &[u8], table: &mut ParameterSetTable<Sps>) -> AvcResult<u32> {
    let mut br = BitReader::new(rbsp);

    let profile_idc = br.read_bits(8) as u8;
    // constraint_set0..2_flag + reserved_zero_5bits
    let constraint_set_flags = br.read_bits(8) as u8;
    let level_idc = br.read_bits(8) as u8;
    let sps_id = read_ue(&mut br);

    table.reset_slot(sps_id)?;

    let mut sps = Sps {
        sps_id,
        profile_idc,
        constraint_set_flags,
        level_idc,
        ..Sps::default()
    };
    parse_sps_body(&mut br, &mut sps)?;

    table.fill_slot(sps_id, sps);
    Ok(sps_id)
}

fn parse_sps_body(br: &mut BitReader, sps: &mut Sps) -> AvcResult<()> {
    if is_high_profile(sps.profile_idc) {
        sps.chroma_format_idc = read_ue(br);
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = br.read_bit() == 1;
        }
        sps.chroma_array_type = if sps.separate_colour_plane_flag {
            0
        } else {
            sps.chroma_format_idc
        };

        skip_ue(br); // bit_depth_luma_minus8
        skip_ue(br); // bit_depth_chroma_minus8
        br.skip_bits(1); // qpprime_y_zero_transform_bypass_flag

        let seq_scaling_matrix_present = br.read_bit() == 1;
        if seq_scaling_matrix_present {
            let count = if sps.chroma_format_idc != 3 { 8 } else { 12 };
            skip_scaling_matrix(br, count);
        }
    } else {
        sps.chroma_format_idc = 1;
        sps.chroma_array_type = 1;
    }

    sps.log2_max_frame_num = read_ue(br).saturating_add(4);
    sps.pic_order_cnt_type = read_ue(br);
    match sps.pic_order_cnt_type {
        0 => {
            sps.log2_max_pic_order_cnt_lsb = read_ue(br).saturating_add(4);
        }
        1 => {
            sps.delta_pic_order_always_zero_flag = br.read_bit() == 1;
            skip_se(br); // offset_for_non_ref_pic
            skip_se(br); // offset_for_top_to_bottom_field
            let num_ref_frames_in_poc_cycle = read_ue(br);
            for _ in 0..num_ref_frames_in_poc_cycle {
                if br.is_eof() {
                    break;
                }
                skip_se(br); // offset_for_ref_frame
            }
        }
        _ => {}
    }

    skip_ue(br); // max_num_ref_frames
    br.skip_bits(1); // gaps_in_frame_num_value_allowed_flag
    sps.pic_width_in_mbs = read_ue(br).saturating_add(1);
    sps.pic_height_in_map_units = read_ue(br).saturating_add(1);
    sps.frame_mbs_only_flag = br.read_bit() == 1;
    if !sps.frame_mbs_only_flag {
        br.skip_bits(1); // mb_adaptive_frame_field_flag
    }
    br.skip_bits(1); // direct_8x8_inference_flag

    let frame_cropping_flag = br.read_bit() == 1;
    if frame_cropping_flag {
        for _ in 0..4 {
            skip_ue(br);
        }
    }

    let vui_parameters_present = br.read_bit() == 1;
    if vui_parameters_present {
        skip_vui_parameters(br);
    }

    if !rbsp_trailing_bits_valid(br) {
        return Err(AvcError::BadData(format!(
            "H264: SPS rbsp_trailing_bits 无效, sps_id={}",
            sps.sps_id
        )));
    }
    Ok(())
}

// ============================================================
// VUI
// ============================================================

fn skip_hrd_parameters(br: &mut BitReader) {
    let cpb_cnt_minus1 = read_ue(br);
    br.skip_bits(4); // bit_rate_scale
    br.skip_bits(4); // cpb_size_scale
    for _ in 0..=cpb_cnt_minus1 {
        if br.is_eof() {
            break;
        }
        skip_ue(br); // bit_rate_value_minus1
        skip_ue(br); // cpb_size_value_minus1
        br.skip_bits(1); // cbr_flag
    }
    br.skip_bits(5); // initial_cpb_removal_delay_length_minus1
    br.skip_bits(5); // cpb_removal_delay_length_minus1
    br.skip_bits(5); // dpb_output_delay_length_minus1
    br.skip_bits(5); // time_offset_length
}

fn skip_vui_parameters(br: &mut BitReader) {
    let aspect_ratio_info_present = br.read_bit() == 1;
    if aspect_ratio_info_present {
        let aspect_ratio_idc = br.read_bits(8);
        if aspect_ratio_idc == EXTENDED_SAR {
            br.skip_bits(16); // sar_width
            br.skip_bits(16); // sar_height
        }
    }

    let overscan_info_present = br.read_bit() == 1;
    if overscan_info_present {
        br.skip_bits(1); // overscan_appropriate_flag
    }

    let video_signal_type_present = br.read_bit() == 1;
    if video_signal_type_present {
        br.skip_bits(3); // video_format
        br.skip_bits(1); // video_full_range_flag
        let colour_description_present = br.read_bit() == 1;
        if colour_description_present {
            br.skip_bits(8); // colour_primaries
            br.skip_bits(8); // transfer_characteristics
            br.skip_bits(8); // matrix_coefficients
        }
    }

    let chroma_loc_info_present = br.read_bit() == 1;
    if chroma_loc_info_present {
        skip_ue(br); // chroma_sample_loc_type_top_field
        skip_ue(br); // chroma_sample_loc_type_bottom_field
    }

    let timing_info_present = br.read_bit() == 1;
    if timing_info_present {
        br.skip_bits(32); // num_units_in_tick
        br.skip_bits(32); // time_scale
        br.skip_bits(1); // fixed_frame_rate_flag
    }

    let nal_hrd_present = br.read_bit() == 1;
    if nal_hrd_present {
        skip_hrd_parameters(br);
    }
    let vcl_hrd_present = br.read_bit() == 1;
    if vcl_hrd_present {
        skip_hrd_parameters(br);
    }
    if nal_hrd_present || vcl_hrd_present {
        br.skip_bits(1); // low_delay_hrd_flag
    }

    br.skip_bits(1); // pic_struct_present_flag
    let bitstream_restriction = br.read_bit() == 1;
    if bitstream_restriction {
        br.skip_bits(1); // motion_vectors_over_pic_boundaries_flag
        skip_ue(br); // max_bytes_per_pic_denom
        skip_ue(br); // max_bits_per_mb_denom
        skip_ue(br); // log2_max_mv_length_horizontal
        skip_ue(br); // log2_max_mv_length_vertical
        skip_ue(br); // max_num_reorder_frames
        skip_ue(br); // max_dec_frame_buffering
    }
}
