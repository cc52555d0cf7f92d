//! Emulation prevention 字节处理.
//!
//! H.264 编码器在 NAL 载荷中每遇到 `00 00 {00,01,02,03}` 就插入一个 `0x03`,
//! 避免与起始码混淆. 语法解析前需要移除这些 `0x03` 得到 RBSP;
//! 计算 slice header 在原始载荷中的长度时, 又需要把移除的字节数补回来.

use std::borrow::Cow;

use avcut_core::{AvcError, AvcResult};

/// 去除防竞争字节后的 RBSP, 同时记录每个被移除字节的位置
#[derive(Debug, Clone)]
pub struct Rbsp<'a> {
    data: Cow<'a, [u8]>,
    /// 每个防竞争字节之后第一个 RBSP 字节的下标, 升序
    escape_positions: Vec<usize>,
}

impl<'a> Rbsp<'a> {
    /// 是否至少移除了一个防竞争字节
    pub fn has_escapes(&self) -> bool {
        !self.escape_positions.is_empty()
    }

    /// 前 `len` 个 RBSP 字节之间实际移除的防竞争字节数
    ///
    /// 位于第 `len` 个字节之前的转义才计入, 即原始载荷中覆盖这 `len` 个字节所需的额外字节.
    pub fn escapes_before(&self, len: usize) -> usize {
        self.escape_positions.partition_point(|&pos| pos < len)
    }

    /// 取出 RBSP 数据
    pub fn into_data(self) -> Cow<'a, [u8]> {
        self.data
    }
}

impl std::ops::Deref for Rbsp<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// 移除 emulation prevention 字节, 得到 RBSP
///
/// 载荷中不存在 `00 00 03` 时直接借用原数据, 不做拷贝.
/// 返回 [`Cow::Owned`] 即表示至少剥离了一个防竞争字节.
pub fn decode(payload: &[u8]) -> AvcResult<Cow<'_, [u8]>> {
    decode_tracked(payload).map(Rbsp::into_data)
}

/// 移除 emulation prevention 字节, 并记录被移除字节在 RBSP 中的位置
///
/// 防竞争字节之后的字节必须 ≤ 3, 否则返回 [`AvcError::BadData`].
/// 载荷以 `00 00 03` 结尾 (截断在转义中间) 时输出已解出的部分, 不报错,
/// 因此 RBSP 长度不一定等于输入长度.
///
/// 转义之后的字节参与下一次匹配, 所以 `00 00 03 00 00 03 01` 中的两个 `03` 都会被移除.
pub fn decode_tracked(payload: &[u8]) -> AvcResult<Rbsp<'_>> {
    let requires_strip = payload.windows(3).any(|w| w == [0x00, 0x00, 0x03]);
    if !requires_strip {
        return Ok(Rbsp {
            data: Cow::Borrowed(payload),
            escape_positions: Vec::new(),
        });
    }

    let alloc_failed = || {
        AvcError::AllocationFailed(format!(
            "H264: emulation prevention 输出缓冲区, size={}",
            payload.len()
        ))
    };
    let mut rbsp = Vec::new();
    rbsp.try_reserve_exact(payload.len()).map_err(|_| alloc_failed())?;
    let mut escape_positions = Vec::new();

    // 最近三个输入字节, 初值保证前两个字节不会误判
    let mut last_three_bytes = 1u32;
    let mut bytes = payload.iter();
    while let Some(&byte) = bytes.next() {
        last_three_bytes = ((last_three_bytes << 8) | u32::from(byte)) & 0xFF_FFFF;
        if last_three_bytes != 0x03 {
            rbsp.push(byte);
            continue;
        }

        // 只解码载荷的一部分时转义可能位于末尾, 输出已有内容即可
        let Some(&next) = bytes.next() else {
            break;
        };
        if next > 0x03 {
            return Err(AvcError::BadData(format!(
                "H264: emulation prevention 转义后的字节非法, byte=0x{:02X}",
                next
            )));
        }
        escape_positions.try_reserve(1).map_err(|_| alloc_failed())?;
        escape_positions.push(rbsp.len());
        last_three_bytes = ((last_three_bytes << 8) | u32::from(next)) & 0xFF_FFFF;
        rbsp.push(next);
    }

    Ok(Rbsp {
        data: Cow::Owned(rbsp),
        escape_positions,
    })
}

/// 统计一段 RBSP 重新编码时需要插入的防竞争字节数
///
/// 逐个匹配 `00 00 b` (b ≤ 3), 命中后跳过整个三元组继续扫描 (不重叠).
/// 连续转义 (`00 00 00 00 01`) 只计一次; 需要精确换算偏移时使用 [`Rbsp::escapes_before`].
pub fn count_required_escapes(rbsp: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + 2 < rbsp.len() {
        if rbsp[i] == 0x00 && rbsp[i + 1] == 0x00 && rbsp[i + 2] <= 0x03 {
            count += 1;
            i += 3;
        } else {
            i += 1;
        }
    }
    count
}
