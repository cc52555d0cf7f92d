//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区中顺序读取, 是所有 Exp-Golomb 与参数集语法解析的基础.
//!
//! # 末尾语义
//!
//! 读取越过缓冲区末尾时不会返回错误, 而是置位一个粘滞的 end-of-input 标志,
//! 之后所有读取都返回 0. 由调用方在语法上必须还有数据的位置检查 [`BitReader::is_eof`]
//! 并报告错误. 这样畸形或被截断的输入只会导致有界的工作量, 不会越界访问.

/// 比特流读取器
///
/// 字节按需加载: [`BitReader::byte_position`] 返回已加载的字节数,
/// 部分读取的字节也计为已消耗.
///
/// # 示例
/// ```
/// use avcut_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0b1011);
/// assert_eq!(br.read_bits(4), 0b0001);
/// assert_eq!(br.read_bits(8), 0b01010101);
/// assert!(!br.is_eof());
/// assert_eq!(br.read_bit(), 0);
/// assert!(br.is_eof());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 下一个待加载字节的索引
    byte_pos: usize,
    /// 当前已加载的字节
    cur_byte: u8,
    /// 当前字节中尚未读取的位数 (0-8)
    bits_in_byte: u8,
    /// end-of-input 标志, 一旦置位不再清除
    eof: bool,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            cur_byte: 0,
            bits_in_byte: 0,
            eof: false,
        }
    }

    /// 是否已尝试读取越过末尾的数据
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 - self.bits_in_byte as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() - self.byte_pos) * 8 + self.bits_in_byte as usize
    }

    /// 获取已加载的字节数 (部分读取的字节计入)
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// 读取 1 个位, 越过末尾时返回 0 并置位 end-of-input
    pub fn read_bit(&mut self) -> u32 {
        if self.bits_in_byte == 0 {
            match self.data.get(self.byte_pos) {
                Some(&byte) => {
                    self.cur_byte = byte;
                    self.byte_pos += 1;
                    self.bits_in_byte = 8;
                }
                None => {
                    self.eof = true;
                    return 0;
                }
            }
        }

        self.bits_in_byte -= 1;
        u32::from((self.cur_byte >> self.bits_in_byte) & 1)
    }

    /// 读取 N 个位
    ///
    /// 返回值的低 N 位有效. N 超过 32 时多出的高位被丢弃, 只保留最后 32 位.
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let mut n = n;
        if n > 32 {
            self.skip_bits(n - 32);
            n = 32;
        }

        let mut result = 0u32;
        for _ in 0..n {
            result = (result << 1) | self.read_bit();
        }
        result
    }

    /// 跳过 N 个位
    ///
    /// 开销与 N 无关, 码流中的异常宽度不会造成长时间循环.
    pub fn skip_bits(&mut self, n: u32) {
        let mut remaining = n as usize;

        // 先消耗当前字节内剩余的位
        let from_current = remaining.min(self.bits_in_byte as usize);
        self.bits_in_byte -= from_current as u8;
        remaining -= from_current;
        if remaining == 0 {
            return;
        }

        let whole_bytes = remaining / 8;
        let rest_bits = (remaining % 8) as u8;
        let available = self.data.len() - self.byte_pos;
        if whole_bytes > available || (whole_bytes == available && rest_bits > 0) {
            self.byte_pos = self.data.len();
            self.bits_in_byte = 0;
            self.eof = true;
            return;
        }

        self.byte_pos += whole_bytes;
        if rest_bits > 0 {
            self.cur_byte = self.data[self.byte_pos];
            self.byte_pos += 1;
            self.bits_in_byte = 8 - rest_bits;
        }
    }
}
