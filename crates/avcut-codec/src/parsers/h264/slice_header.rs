//! Slice header 长度计算.
//!
//! 按 SPS/PPS 走完 slice_header() 语法, 得到 slice data 在原始 NAL 中的起始偏移,
//! 不解析 slice data 本身. 各字段只消耗位, 不保留取值.
//!
//! 长度先以 RBSP 字节计 (部分读取的字节计入), 再加上解码时在这段 RBSP 之前
//! 实际剥离的防竞争字节数, 换算回原始载荷中的字节数.

use avcut_core::bitreader::BitReader;
use avcut_core::{AvcError, AvcResult};

use super::emulation;
use super::exp_golomb::{read_ue, skip_se, skip_ue};
use super::nal::NalUnitType;
use super::pps::Pps;
use super::sps::Sps;
use super::store::ParameterSetStore;
use super::syntax::ceil_log2;

/// Slice 类型 (slice_type % 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    /// P slice
    P,
    /// B slice
    B,
    /// I slice
    I,
    /// SP slice
    Sp,
    /// SI slice
    Si,
}

impl SliceType {
    /// 从 slice_type 语法值创建, 5-9 归一到 0-4, 大于 9 返回 None
    pub fn from_raw(value: u32) -> Option<Self> {
        let base = match value {
            0..=4 => value,
            5..=9 => value - 5,
            _ => return None,
        };
        Some(match base {
            0 => Self::P,
            1 => Self::B,
            2 => Self::I,
            3 => Self::Sp,
            _ => Self::Si,
        })
    }

    /// 是否为 I 或 SI (无参考列表)
    pub fn is_intra(&self) -> bool {
        matches!(self, Self::I | Self::Si)
    }

    /// 是否为 P 或 SP
    pub fn is_predictive(&self) -> bool {
        matches!(self, Self::P | Self::Sp)
    }
}

impl std::fmt::Display for SliceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P => write!(f, "P"),
            Self::B => write!(f, "B"),
            Self::I => write!(f, "I"),
            Self::Sp => write!(f, "SP"),
            Self::Si => write!(f, "SI"),
        }
    }
}

/// Slice header 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeaderInfo {
    /// nal_ref_idc
    pub nal_ref_idc: u8,
    /// NAL 单元类型
    pub nal_unit_type: NalUnitType,
    /// 归一后的 slice 类型
    pub slice_type: SliceType,
    /// 引用的 PPS ID
    pub pps_id: u32,
    /// 换算时补回的防竞争字节数
    pub escape_bytes: usize,
    /// header 在原始 NAL 中的字节数 (含 NAL 头部与防竞争字节)
    pub header_size: usize,
}

/// 计算 slice header 长度
///
/// `nal` 为完整的 slice NAL 单元 (含头部字节, 不含长度前缀/起始码).
/// 引用的 PPS/SPS 必须已注册.
pub fn parse_slice_header(nal: &[u8], store: &ParameterSetStore) -> AvcResult<SliceHeaderInfo> {
    let rbsp = emulation::decode_tracked(nal)?;
    let mut br = BitReader::new(&rbsp);

    br.skip_bits(1); // forbidden_zero_bit
    let nal_ref_idc = br.read_bits(2) as u8;
    let nal_unit_type = NalUnitType::from_type_id(br.read_bits(5) as u8);

    skip_ue(&mut br); // first_mb_in_slice
    let raw_slice_type = read_ue(&mut br);
    let Some(slice_type) = SliceType::from_raw(raw_slice_type) else {
        return Err(AvcError::BadData(format!(
            "H264: slice_type 非法, slice_type={}",
            raw_slice_type
        )));
    };

    let pps_id = read_ue(&mut br);
    let Some(pps) = store.pps.get(pps_id) else {
        return Err(AvcError::BadData(format!(
            "H264: slice 引用的 PPS 不存在, pps_id={}",
            pps_id
        )));
    };
    let Some(sps) = store.sps.get(pps.sps_id) else {
        return Err(AvcError::BadData(format!(
            "H264: slice 引用的 SPS 不存在, pps_id={}, sps_id={}",
            pps_id, pps.sps_id
        )));
    };

    let walker = SliceHeaderWalker {
        sps,
        pps,
        nal_ref_idc,
        nal_unit_type,
        slice_type,
    };
    walker.walk(&mut br);

    if br.is_eof() {
        return Err(AvcError::BadData(format!(
            "H264: slice header 数据溢出, pps_id={}, size={}",
            pps_id,
            nal.len()
        )));
    }

    let consumed = br.byte_position();
    let escape_bytes = rbsp.escapes_before(consumed);

    Ok(SliceHeaderInfo {
        nal_ref_idc,
        nal_unit_type,
        slice_type,
        pps_id,
        escape_bytes,
        header_size: consumed + escape_bytes,
    })
}

/// PPS 之后的 slice header 语法
struct SliceHeaderWalker<'a> {
    sps: &'a Sps,
    pps: &'a Pps,
    nal_ref_idc: u8,
    nal_unit_type: NalUnitType,
    slice_type: SliceType,
}

impl SliceHeaderWalker<'_> {
    fn walk(&self, br: &mut BitReader) {
        let sps = self.sps;
        let pps = self.pps;
        let slice_type = self.slice_type;

        if sps.separate_colour_plane_flag {
            br.skip_bits(2); // colour_plane_id
        }
        br.skip_bits(sps.log2_max_frame_num); // frame_num

        let mut field_pic_flag = false;
        if !sps.frame_mbs_only_flag {
            field_pic_flag = br.read_bit() == 1;
            if field_pic_flag {
                br.skip_bits(1); // bottom_field_flag
            }
        }

        if self.nal_unit_type.is_idr() {
            skip_ue(br); // idr_pic_id
        }

        let bottom_delta_present =
            pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag;
        if sps.pic_order_cnt_type == 0 {
            br.skip_bits(sps.log2_max_pic_order_cnt_lsb); // pic_order_cnt_lsb
            if bottom_delta_present {
                skip_se(br); // delta_pic_order_cnt_bottom
            }
        }
        if sps.pic_order_cnt_type == 1 && !sps.delta_pic_order_always_zero_flag {
            skip_se(br); // delta_pic_order_cnt[0]
            if bottom_delta_present {
                skip_se(br); // delta_pic_order_cnt[1]
            }
        }

        if pps.redundant_pic_cnt_present_flag {
            skip_ue(br); // redundant_pic_cnt
        }

        if slice_type == SliceType::B {
            br.skip_bits(1); // direct_spatial_mv_pred_flag
        }

        let mut num_ref_idx = pps.num_ref_idx;
        if slice_type.is_predictive() || slice_type == SliceType::B {
            let num_ref_idx_active_override = br.read_bit() == 1;
            if num_ref_idx_active_override {
                num_ref_idx[0] = read_ue(br).saturating_add(1);
                if slice_type == SliceType::B {
                    num_ref_idx[1] = read_ue(br).saturating_add(1);
                }
            }
        }

        self.skip_ref_pic_list_modification(br);

        let weighted = (pps.weighted_pred_flag && slice_type.is_predictive())
            || (pps.weighted_bipred_idc == 1 && slice_type == SliceType::B);
        if weighted {
            self.skip_pred_weight_table(br, num_ref_idx);
        }

        if self.nal_ref_idc != 0 {
            self.skip_dec_ref_pic_marking(br);
        }

        if pps.entropy_coding_mode_flag && !slice_type.is_intra() {
            skip_ue(br); // cabac_init_idc
        }

        skip_se(br); // slice_qp_delta
        if matches!(slice_type, SliceType::Sp | SliceType::Si) {
            if slice_type == SliceType::Sp {
                br.skip_bits(1); // sp_for_switch_flag
            }
            skip_se(br); // slice_qs_delta
        }

        if pps.deblocking_filter_control_present_flag {
            let disable_deblocking_filter_idc = read_ue(br);
            if disable_deblocking_filter_idc != 1 {
                skip_se(br); // slice_alpha_c0_offset_div2
                skip_se(br); // slice_beta_offset_div2
            }
        }

        if pps.has_slice_group_change_cycle() {
            let change_rate = u64::from(pps.slice_group_change_rate.max(1));
            let cycles = sps.pic_size_in_map_units().div_ceil(change_rate);
            br.skip_bits(ceil_log2(cycles + 1)); // slice_group_change_cycle
        }
    }

    /// ref_pic_list_modification() / ref_pic_list_mvc_modification()
    fn skip_ref_pic_list_modification(&self, br: &mut BitReader) {
        let mvc = self.nal_unit_type.is_mvc_slice();
        if !self.slice_type.is_intra() {
            skip_modification_ops(br, mvc); // L0
        }
        if self.slice_type == SliceType::B {
            skip_modification_ops(br, mvc); // L1
        }
    }

    fn skip_pred_weight_table(&self, br: &mut BitReader, num_ref_idx: [u32; 2]) {
        let has_chroma = self.sps.chroma_array_type != 0;

        skip_ue(br); // luma_log2_weight_denom
        if has_chroma {
            skip_ue(br); // chroma_log2_weight_denom
        }

        let lists = if self.slice_type == SliceType::B { 2 } else { 1 };
        for &count in &num_ref_idx[..lists] {
            for _ in 0..count {
                if br.is_eof() {
                    break;
                }
                let luma_weight_flag = br.read_bit() == 1;
                if luma_weight_flag {
                    skip_se(br); // luma_weight
                    skip_se(br); // luma_offset
                }
                if has_chroma {
                    let chroma_weight_flag = br.read_bit() == 1;
                    if chroma_weight_flag {
                        for _ in 0..2 {
                            skip_se(br); // chroma_weight
                            skip_se(br); // chroma_offset
                        }
                    }
                }
            }
        }
    }

    fn skip_dec_ref_pic_marking(&self, br: &mut BitReader) {
        if self.nal_unit_type.is_idr() {
            br.skip_bits(1); // no_output_of_prior_pics_flag
            br.skip_bits(1); // long_term_reference_flag
            return;
        }

        let adaptive_ref_pic_marking_mode = br.read_bit() == 1;
        if !adaptive_ref_pic_marking_mode {
            return;
        }
        loop {
            let mmco = read_ue(br);
            if mmco == 1 || mmco == 3 {
                skip_ue(br); // difference_of_pic_nums_minus1
            }
            if mmco == 2 {
                skip_ue(br); // long_term_pic_num
            }
            if mmco == 3 || mmco == 6 {
                skip_ue(br); // long_term_frame_idx
            }
            if mmco == 4 {
                skip_ue(br); // max_long_term_frame_idx_plus1
            }
            if mmco == 0 || br.is_eof() {
                break;
            }
        }
    }
}

/// 单个参考列表的修改操作, 以 modification_of_pic_nums_idc == 3 结束
fn skip_modification_ops(br: &mut BitReader, mvc: bool) {
    let ref_pic_list_modification_flag = br.read_bit() == 1;
    if !ref_pic_list_modification_flag {
        return;
    }
    loop {
        let idc = read_ue(br);
        match idc {
            // abs_diff_pic_num_minus1
            0 | 1 => skip_ue(br),
            // long_term_pic_num
            2 => skip_ue(br),
            // abs_diff_view_idx_minus1
            4 | 5 if mvc => skip_ue(br),
            _ => {}
        }
        if idc == 3 || br.is_eof() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avcut_core::bitwriter::BitWriter;

    fn base_sps() -> Sps {
        Sps {
            sps_id: 0,
            chroma_format_idc: 1,
            chroma_array_type: 1,
            log2_max_frame_num: 4,
            pic_order_cnt_type: 2,
            pic_width_in_mbs: 20,
            pic_height_in_map_units: 15,
            frame_mbs_only_flag: true,
            ..Sps::default()
        }
    }

    fn base_pps() -> Pps {
        Pps {
            pps_id: 0,
            sps_id: 0,
            num_ref_idx: [1, 1],
            ..Pps::default()
        }
    }

    fn store_with(sps: Sps, pps: Pps) -> ParameterSetStore {
        let mut store = ParameterSetStore::new();
        let (sps_id, pps_id) = (sps.sps_id, pps.pps_id);
        store.sps.reset_slot(sps_id).unwrap();
        store.sps.fill_slot(sps_id, sps);
        store.pps.reset_slot(pps_id).unwrap();
        store.pps.fill_slot(pps_id, pps);
        store
    }

    /// 写入 NAL 头部与 first_mb/slice_type/pps_id
    fn write_slice_start(bw: &mut BitWriter, nal_header: u8, slice_type: u32, pps_id: u32) {
        bw.write_bits(u32::from(nal_header), 8);
        bw.write_ue(0); // first_mb_in_slice
        bw.write_ue(slice_type);
        bw.write_ue(pps_id);
    }

    /// 结束 header, 追加 slice data, 返回 (NAL 数据, header 字节数)
    fn finish_with_data(mut bw: BitWriter) -> (Vec<u8>, usize) {
        let header_bytes = bw.bits_written().div_ceil(8);
        bw.write_bits(0x5A, 8);
        bw.write_bits(0xC3, 8);
        (bw.finish(), header_bytes)
    }

    #[test]
    fn test_minimal_idr_i_slice() {
        let store = store_with(base_sps(), base_pps());

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x65, 7, 0);
        bw.write_bits(0, 4); // frame_num
        bw.write_ue(0); // idr_pic_id
        bw.write_bits(0, 2); // dec_ref_pic_marking (IDR)
        bw.write_se(0); // slice_qp_delta
        // 8 + 1 + 7 + 1 + 4 + 1 + 2 + 1 = 25 位
        assert_eq!(bw.bits_written(), 25);
        let (nal, header_bytes) = finish_with_data(bw);
        assert_eq!(header_bytes, 4);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.header_size, 4);
        assert_eq!(info.escape_bytes, 0);
        assert_eq!(info.nal_ref_idc, 3);
        assert_eq!(info.nal_unit_type, NalUnitType::SliceIdr);
        assert_eq!(info.slice_type, SliceType::I);
        assert_eq!(info.pps_id, 0);
    }

    #[test]
    fn test_header_ending_on_byte_boundary() {
        let store = store_with(base_sps(), base_pps());

        // 非参考 I slice: 8 + 1 + 3 + 1 + 4 + 7 (qp_delta=-4 → 0001000) = 24 位
        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x01, 2, 0);
        bw.write_bits(3, 4);
        bw.write_se(-4);
        assert_eq!(bw.bits_written(), 24);
        let (nal, _) = finish_with_data(bw);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.header_size, 3, "恰好在字节边界结束时不应多计一个字节");
        assert_eq!(info.nal_ref_idc, 0);

        // header 恰好占满整个 NAL 也不算溢出
        let info = parse_slice_header(&nal[..3], &store).unwrap();
        assert_eq!(info.header_size, 3);
    }

    #[test]
    fn test_slice_header_with_escape_bytes() {
        let sps = Sps {
            log2_max_frame_num: 24,
            ..base_sps()
        };
        let store = store_with(sps, base_pps());

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x65, 7, 0);
        bw.write_bits(0, 24); // frame_num
        bw.write_ue(63); // idr_pic_id
        bw.write_bits(0, 2);
        bw.write_se(0);
        bw.write_bits(0x7F, 7);
        bw.write_bits(0xAB, 8);
        let clean = bw.finish();
        assert_eq!(&clean[..8], &[0x65, 0x88, 0x80, 0x00, 0x00, 0x01, 0x00, 0xFF]);

        let mut raw = clean[..5].to_vec();
        raw.push(0x03);
        raw.extend_from_slice(&clean[5..]);

        let info = parse_slice_header(&raw, &store).unwrap();
        // RBSP 中 57 位 → 8 字节, 再补回 1 个防竞争字节
        assert_eq!(info.escape_bytes, 1);
        assert_eq!(info.header_size, 9);
        assert_eq!(raw[info.header_size], 0xAB);

        let info = parse_slice_header(&clean, &store).unwrap();
        assert_eq!(info.escape_bytes, 0, "未剥离防竞争字节时不做换算");
        assert_eq!(info.header_size, 8);
    }

    #[test]
    fn test_slice_header_with_consecutive_escapes() {
        let sps = Sps {
            log2_max_frame_num: 40,
            ..base_sps()
        };
        let store = store_with(sps, base_pps());

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x65, 7, 0);
        bw.write_bits(0, 32);
        bw.write_bits(0, 8); // frame_num
        bw.write_ue(63); // idr_pic_id
        bw.write_bits(0, 2);
        bw.write_se(0);
        bw.write_bits(0x7F, 7);
        bw.write_bits(0xAB, 8);
        let clean = bw.finish();
        assert_eq!(
            &clean[..10],
            &[0x65, 0x88, 0x80, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0xFF]
        );

        // 00 00 00 00 01 编码为 00 00 03 00 00 03 01
        let mut raw = clean[..5].to_vec();
        raw.push(0x03);
        raw.extend_from_slice(&clean[5..7]);
        raw.push(0x03);
        raw.extend_from_slice(&clean[7..]);

        let info = parse_slice_header(&raw, &store).unwrap();
        // RBSP 中 73 位 → 10 字节, 两个转义都位于 header 内
        assert_eq!(info.escape_bytes, 2);
        assert_eq!(info.header_size, 12);
        assert_eq!(raw[info.header_size], 0xAB, "header 之后应紧接 slice data");
    }

    #[test]
    fn test_p_slice_full_syntax() {
        let sps = Sps {
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb: 6,
            frame_mbs_only_flag: false,
            ..base_sps()
        };
        let pps = Pps {
            entropy_coding_mode_flag: true,
            bottom_field_pic_order_in_frame_present_flag: true,
            weighted_pred_flag: true,
            deblocking_filter_control_present_flag: true,
            redundant_pic_cnt_present_flag: true,
            num_ref_idx: [2, 1],
            ..base_pps()
        };
        let store = store_with(sps, pps);

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x41, 5, 0); // ref_idc=2, 非 IDR, P
        bw.write_bits(9, 4); // frame_num
        bw.write_bit(false); // field_pic_flag
        bw.write_bits(17, 6); // pic_order_cnt_lsb
        bw.write_se(-1); // delta_pic_order_cnt_bottom
        bw.write_ue(0); // redundant_pic_cnt
        bw.write_bit(true); // num_ref_idx_active_override_flag
        bw.write_ue(2); // num_ref_idx_l0_active_minus1 → 3
        bw.write_bit(true); // ref_pic_list_modification_flag_l0
        bw.write_ue(0);
        bw.write_ue(4);
        bw.write_ue(2);
        bw.write_ue(1);
        bw.write_ue(3);
        // pred_weight_table
        bw.write_ue(5);
        bw.write_ue(5);
        for i in 0..3 {
            bw.write_bit(i != 1);
            if i != 1 {
                bw.write_se(3);
                bw.write_se(-2);
            }
            bw.write_bit(i == 2);
            if i == 2 {
                for _ in 0..4 {
                    bw.write_se(1);
                }
            }
        }
        // dec_ref_pic_marking
        bw.write_bit(true);
        for (mmco, args) in [(1u32, 1), (3, 2), (2, 1), (6, 1), (4, 1), (5, 0), (0, 0)] {
            bw.write_ue(mmco);
            for _ in 0..args {
                bw.write_ue(7);
            }
        }
        bw.write_ue(1); // cabac_init_idc
        bw.write_se(-6); // slice_qp_delta
        bw.write_ue(0); // disable_deblocking_filter_idc
        bw.write_se(2);
        bw.write_se(-2);
        let (nal, header_bytes) = finish_with_data(bw);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.slice_type, SliceType::P);
        assert_eq!(info.nal_ref_idc, 2);
        assert_eq!(info.header_size, header_bytes);
    }

    #[test]
    fn test_b_slice_with_field_and_poc_type1() {
        let sps = Sps {
            pic_order_cnt_type: 1,
            frame_mbs_only_flag: false,
            chroma_array_type: 0,
            ..base_sps()
        };
        let pps = Pps {
            bottom_field_pic_order_in_frame_present_flag: true,
            weighted_bipred_idc: 1,
            deblocking_filter_control_present_flag: true,
            num_ref_idx: [1, 2],
            ..base_pps()
        };
        let store = store_with(sps, pps);

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x01, 1, 0); // 非参考 B
        bw.write_bits(2, 4);
        bw.write_bit(true); // field_pic_flag
        bw.write_bit(true); // bottom_field_flag
        bw.write_se(4); // delta_pic_order_cnt[0], 场图像没有 [1]
        bw.write_bit(true); // direct_spatial_mv_pred_flag
        bw.write_bit(false); // 不覆盖参考索引数
        bw.write_bit(false); // L0 无修改
        bw.write_bit(true); // L1 修改
        bw.write_ue(1);
        bw.write_ue(0);
        bw.write_ue(3);
        // pred_weight_table: chroma_array_type=0, L0 1 项, L1 2 项
        bw.write_ue(6);
        bw.write_bit(true);
        bw.write_se(1);
        bw.write_se(0);
        bw.write_bit(false);
        bw.write_bit(true);
        bw.write_se(-1);
        bw.write_se(5);
        bw.write_se(0); // slice_qp_delta
        bw.write_ue(1); // disable_deblocking_filter_idc=1, 无 offset
        let (nal, header_bytes) = finish_with_data(bw);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.slice_type, SliceType::B);
        assert_eq!(info.header_size, header_bytes);
    }

    #[test]
    fn test_sp_and_si_slices() {
        let store = store_with(base_sps(), base_pps());

        for (slice_type, expected) in [(3u32, SliceType::Sp), (9, SliceType::Si)] {
            let mut bw = BitWriter::new();
            write_slice_start(&mut bw, 0x01, slice_type, 0);
            bw.write_bits(0, 4);
            if expected == SliceType::Sp {
                bw.write_bit(false); // num_ref_idx_active_override_flag
                bw.write_bit(false); // ref_pic_list_modification_flag_l0
            }
            bw.write_se(0); // slice_qp_delta
            if expected == SliceType::Sp {
                bw.write_bit(true); // sp_for_switch_flag
            }
            bw.write_se(-3); // slice_qs_delta
            let (nal, header_bytes) = finish_with_data(bw);

            let info = parse_slice_header(&nal, &store).unwrap();
            assert_eq!(info.slice_type, expected);
            assert_eq!(info.header_size, header_bytes, "slice_type={slice_type}");
        }
    }

    #[test]
    fn test_mvc_modification_reads_view_index() {
        let store = store_with(base_sps(), base_pps());

        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x14, 0, 0); // nal_unit_type=20, ref_idc=0, P
        bw.write_bits(0, 4);
        bw.write_bit(false);
        bw.write_bit(true);
        bw.write_ue(4);
        bw.write_ue(0); // abs_diff_view_idx_minus1
        bw.write_ue(5);
        bw.write_ue(2);
        bw.write_ue(3);
        bw.write_se(0);
        let (nal, header_bytes) = finish_with_data(bw);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.nal_unit_type, NalUnitType::SliceExtension);
        assert_eq!(info.header_size, header_bytes);

        // 同样的语法放在普通 slice 中, idc 4/5 不带参数, 长度不同
        let mut plain = nal.clone();
        plain[0] = 0x01;
        let plain_size = parse_slice_header(&plain, &store)
            .map(|info| info.header_size)
            .ok();
        assert_ne!(plain_size, Some(header_bytes));
    }

    #[test]
    fn test_slice_group_change_cycle() {
        let pps = Pps {
            num_slice_groups_minus1: 1,
            slice_group_map_type: 4,
            slice_group_change_rate: 10,
            ..base_pps()
        };
        let store = store_with(base_sps(), pps);

        // 300 个 map unit, rate=10 → ceil(log2(30 + 1)) = 5 位
        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x01, 2, 0);
        bw.write_bits(0, 4);
        bw.write_se(0);
        bw.write_bits(0b10101, 5);
        let (nal, header_bytes) = finish_with_data(bw);

        let info = parse_slice_header(&nal, &store).unwrap();
        assert_eq!(info.header_size, header_bytes);
    }

    #[test]
    fn test_invalid_slice_type() {
        let store = store_with(base_sps(), base_pps());
        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x01, 10, 0);
        let (nal, _) = finish_with_data(bw);

        let err = parse_slice_header(&nal, &store).expect_err("slice_type=10 应被拒绝");
        assert!(err.is_bad_data());
        assert!(format!("{err}").contains("slice_type=10"));
    }

    #[test]
    fn test_missing_pps() {
        let store = store_with(base_sps(), base_pps());
        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x01, 2, 3);
        let (nal, _) = finish_with_data(bw);

        let err = parse_slice_header(&nal, &store).expect_err("PPS 不存在");
        assert!(format!("{err}").contains("pps_id=3"));

        let empty = ParameterSetStore::new();
        assert!(parse_slice_header(&nal, &empty).is_err());
    }

    #[test]
    fn test_truncated_slice_header() {
        let store = store_with(base_sps(), base_pps());
        let mut bw = BitWriter::new();
        write_slice_start(&mut bw, 0x65, 7, 0);
        bw.write_bits(0, 4);
        bw.write_ue(0);
        bw.write_bits(0, 2);
        bw.write_se(0);
        let nal = bw.finish();

        let err = parse_slice_header(&nal[..2], &store).expect_err("截断的 header");
        assert!(format!("{err}").contains("溢出"));
        assert!(parse_slice_header(&[], &store).is_err());
    }

    #[test]
    fn test_slice_type_from_raw() {
        assert_eq!(SliceType::from_raw(0), Some(SliceType::P));
        assert_eq!(SliceType::from_raw(6), Some(SliceType::B));
        assert_eq!(SliceType::from_raw(7), Some(SliceType::I));
        assert_eq!(SliceType::from_raw(8), Some(SliceType::Sp));
        assert_eq!(SliceType::from_raw(4), Some(SliceType::Si));
        assert_eq!(SliceType::from_raw(10), None);
        assert!(SliceType::Si.is_intra());
        assert!(SliceType::Sp.is_predictive());
        assert_eq!(SliceType::Sp.to_string(), "SP");
    }
}
