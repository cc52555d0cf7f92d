//! 比特流写入器.
//!
//! 与 [`crate::bitreader::BitReader`] 对应, 按大端位序写入.
//! 主要用于构造测试码流与基准数据: SPS/PPS/slice header 夹具都由它拼出.

/// 比特流写入器
///
/// # 示例
/// ```
/// use avcut_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_ue(3); // 00100
/// bw.write_bits(0b101, 3);
/// assert_eq!(bw.finish(), vec![0b00100101]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 是否位于字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_count == 0
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(bit);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位), 值的低 N 位高位在前写入
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// 写入无符号 Exp-Golomb 编码 ue(v)
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let num_bits = 64 - code.leading_zeros();
        for _ in 0..num_bits - 1 {
            self.write_bit(false);
        }
        for i in (0..num_bits).rev() {
            self.write_bit((code >> i) & 1 == 1);
        }
    }

    /// 写入有符号 Exp-Golomb 编码 se(v)
    ///
    /// 映射: 0→0, 1→1, -1→2, 2→3, -2→4, ...
    pub fn write_se(&mut self, value: i32) {
        let code_num = if value <= 0 {
            (-2 * i64::from(value)) as u32
        } else {
            (2 * i64::from(value) - 1) as u32
        };
        self.write_ue(code_num);
    }

    /// 写入 rbsp_trailing_bits: 一个 1, 再以 0 补齐到字节边界
    pub fn write_trailing_bits(&mut self) {
        self.write_bit(true);
        while !self.is_byte_aligned() {
            self.write_bit(false);
        }
    }

    /// 结束写入, 以 0 补齐最后一个字节并返回数据
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.data.push(self.current_byte);
        }
        self.data
    }
}
