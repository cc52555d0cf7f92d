//! Exp-Golomb 编码读取.
//!
//! - `ue(v)`: 无符号, codeNum = 2^z - 1 + 后缀 (z 为前导零个数)
//! - `se(v)`: 有符号, 映射 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
//!
//! 这些函数都不返回错误: 一旦读取器到达末尾, 前导零计数立即停止并返回占位值,
//! 调用方必须在之后检查 [`BitReader::is_eof`] 而不是信任返回值.

use avcut_core::bitreader::BitReader;

/// 统计前导零个数并消耗终止的 1 位
fn count_leading_zeros(br: &mut BitReader) -> u32 {
    let mut zeros = 0u32;
    while br.read_bit() == 0 && !br.is_eof() {
        zeros += 1;
    }
    zeros
}

/// 读取无符号 Exp-Golomb 编码值 ue(v)
///
/// 前导零达到 32 个及以上时值无法用 u32 表示, 后缀位照常消耗, 返回 `u32::MAX`.
pub fn read_ue(br: &mut BitReader) -> u32 {
    let zeros = count_leading_zeros(br);
    if zeros >= 32 {
        br.skip_bits(zeros);
        return u32::MAX;
    }

    let suffix = br.read_bits(zeros);
    ((1u64 << zeros) - 1 + u64::from(suffix)) as u32
}

/// 读取有符号 Exp-Golomb 编码值 se(v)
pub fn read_se(br: &mut BitReader) -> i32 {
    let code = read_ue(br);
    // 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
    let value = code.div_ceil(2) as i32;
    if code & 1 == 0 { -value } else { value }
}

/// 跳过一个 ue(v), 不计算其值
pub fn skip_ue(br: &mut BitReader) {
    let zeros = count_leading_zeros(br);
    br.skip_bits(zeros);
}

/// 跳过一个 se(v), 位数与 ue(v) 相同
pub fn skip_se(br: &mut BitReader) {
    skip_ue(br);
}

#[cfg(test)]
mod tests {
    use super::*;
    use avcut_core::bitwriter::BitWriter;

    #[test]
    fn test_exp_golomb_ue() {
        // ue(v) 编码: 1 → 0, 010 → 1, 011 → 2, 00100 → 3
        let data = [0b10000000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 0);

        let data = [0b01000000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 1);

        let data = [0b01100000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 2);

        let data = [0b00100000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 3);

        // 7 → "0001000"
        let data = [0b00010000];
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), 7);
        assert!(!br.is_eof());
    }

    #[test]
    fn test_exp_golomb_ue_recovers_code_num_and_skip_matches() {
        let values = [0u32, 1, 2, 5, 14, 15, 254, 255, 1000, 65_534, 1 << 20, u32::MAX - 1];
        for &value in &values {
            let mut bw = BitWriter::new();
            bw.write_ue(value);
            let expected_bits = bw.bits_written();
            bw.write_bit(true);
            let data = bw.finish();

            let mut br = BitReader::new(&data);
            assert_eq!(read_ue(&mut br), value, "ue 解码值不一致, value={value}");
            assert_eq!(br.bits_read(), expected_bits);

            let mut br = BitReader::new(&data);
            skip_ue(&mut br);
            assert_eq!(
                br.bits_read(),
                expected_bits,
                "skip_ue 消耗位数应与 read_ue 一致, value={value}"
            );
            assert_eq!(br.read_bit(), 1);
        }
    }

    #[test]
    fn test_exp_golomb_se() {
        // codeNum 0,1,2,3,4 → 0,1,-1,2,-2
        let expected = [0, 1, -1, 2, -2];
        for (code_num, &value) in expected.iter().enumerate() {
            let mut bw = BitWriter::new();
            bw.write_ue(code_num as u32);
            let data = bw.finish();
            let mut br = BitReader::new(&data);
            assert_eq!(read_se(&mut br), value, "codeNum={code_num}");
        }
    }

    #[test]
    fn test_exp_golomb_se_extremes() {
        let mut bw = BitWriter::new();
        bw.write_se(i32::MAX);
        bw.write_se(-1000);
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        assert_eq!(read_se(&mut br), i32::MAX);
        assert_eq!(read_se(&mut br), -1000);
        // 只剩下补齐用的 0 位
        skip_se(&mut br);
        assert!(br.is_eof());
    }

    #[test]
    fn test_exp_golomb_stops_at_eof() {
        // 全零数据: 前导零计数到末尾停止, 不会死循环
        let data = [0x00, 0x00];
        let mut br = BitReader::new(&data);
        let _ = read_ue(&mut br);
        assert!(br.is_eof(), "全零数据应导致 end-of-input");

        let mut br = BitReader::new(&data);
        skip_ue(&mut br);
        assert!(br.is_eof());

        let mut br = BitReader::new(&[]);
        assert_eq!(read_ue(&mut br), 0, "空数据返回占位值 0");
        assert!(br.is_eof());
    }

    #[test]
    fn test_exp_golomb_too_many_leading_zeros() {
        // 32 个前导零 + 1 + 32 位后缀
        let mut data = vec![0x00; 4];
        data.push(0x80);
        data.extend_from_slice(&[0x00; 4]);
        let mut br = BitReader::new(&data);
        assert_eq!(read_ue(&mut br), u32::MAX);
        assert_eq!(br.bits_read(), 65);
        assert!(!br.is_eof());
    }
}
