//! SPS/PPS/slice header 共用的语法元素.

use avcut_core::bitreader::BitReader;

use super::exp_golomb::read_se;

/// 检查 rbsp_trailing_bits: 一个 1 位, 之后直到末尾全为 0
///
/// 调用前已经处于 end-of-input 视为无效.
pub fn rbsp_trailing_bits_valid(br: &mut BitReader) -> bool {
    if br.is_eof() {
        return false;
    }
    if br.read_bit() != 1 {
        return false;
    }
    while !br.is_eof() {
        if br.read_bit() != 0 {
            return false;
        }
    }
    true
}

/// 跳过一个 scaling_list(), 只消耗位, 不保留系数
pub fn skip_scaling_list(br: &mut BitReader, size: usize) {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = read_se(br);
            next_scale = last_scale.wrapping_add(delta_scale) & 0xFF;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
}

/// 跳过 `count` 个带存在标志的量化矩阵 (前 6 个为 4x4, 其余为 8x8)
pub fn skip_scaling_matrix(br: &mut BitReader, count: usize) {
    for i in 0..count {
        let present = br.read_bit() == 1;
        if present {
            skip_scaling_list(br, if i < 6 { 16 } else { 64 });
        }
    }
}

/// ceil(log2(val)), 即表示 `0..val` 所需的位数
///
/// `val == 0` 按无符号回绕处理, 返回 64.
pub fn ceil_log2(val: u64) -> u32 {
    64 - val.wrapping_sub(1).leading_zeros()
}
