//! H.264 NAL (Network Abstraction Layer) 单元类型与头部.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```
//!
//! # AVCC 样本格式
//!
//! MP4 样本中的 NAL 单元使用 1~4 字节的大端长度前缀 (由 avcC 的 lengthSizeMinusOne 决定):
//! ```text
//! [length: N bytes BE] [NAL data: length bytes] [length] [NAL data] ...
//! ```

use avcut_core::{AvcError, AvcResult};

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片
    Slice,
    /// 数据分区 A (DPA)
    SliceDpa,
    /// 数据分区 B (DPB)
    SliceDpb,
    /// 数据分区 C (DPC)
    SliceDpc,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// SPS 扩展
    SpsExtension,
    /// 前缀 NAL (SVC/MVC)
    PrefixNal,
    /// 子集 SPS (SVC/MVC)
    SubsetSps,
    /// 辅助图像切片
    SliceAux,
    /// MVC/SVC 扩展切片
    SliceExtension,
    /// 深度视图 (3D-AVC) 扩展切片
    SliceExtensionDepth,
    /// 未知或保留类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建 (只看低 5 位)
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id & 0x1F {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            14 => Self::PrefixNal,
            15 => Self::SubsetSps,
            19 => Self::SliceAux,
            20 => Self::SliceExtension,
            21 => Self::SliceExtensionDepth,
            other => Self::Unknown(other),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::PrefixNal => 14,
            Self::SubsetSps => 15,
            Self::SliceAux => 19,
            Self::SliceExtension => 20,
            Self::SliceExtensionDepth => 21,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为关键帧 (IDR)
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }

    /// 是否为 MVC 扩展切片, 其参考列表修改语法带有视图索引
    pub fn is_mvc_slice(&self) -> bool {
        matches!(self, Self::SliceExtension | Self::SliceExtensionDepth)
    }
}

impl std::fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::PrefixNal => write!(f, "Prefix"),
            Self::SubsetSps => write!(f, "SubsetSPS"),
            Self::SliceAux => write!(f, "SliceAux"),
            Self::SliceExtension => write!(f, "SliceExt"),
            Self::SliceExtensionDepth => write!(f, "SliceExtDepth"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// NAL 单元头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// forbidden_zero_bit, 合法码流中恒为 false
    pub forbidden_zero_bit: bool,
    /// nal_ref_idc (参考重要性, 0-3)
    pub ref_idc: u8,
    /// NAL 单元类型
    pub nal_type: NalUnitType,
}

impl NalHeader {
    /// 从头部字节解析
    pub fn from_byte(byte: u8) -> Self {
        Self {
            forbidden_zero_bit: byte & 0x80 != 0,
            ref_idc: (byte >> 5) & 0x03,
            nal_type: NalUnitType::from_type_id(byte),
        }
    }

    /// 从 NAL 数据 (含头部字节) 解析
    pub fn parse(data: &[u8]) -> AvcResult<Self> {
        let Some(&first) = data.first() else {
            return Err(AvcError::BadData("H264: NAL 单元数据为空".into()));
        };
        Ok(Self::from_byte(first))
    }
}

/// 按长度前缀切分 AVCC 样本的迭代器, 由 [`split_length_prefixed`] 创建
#[derive(Debug, Clone)]
pub struct LengthPrefixedNals<'a> {
    data: &'a [u8],
    pos: usize,
    length_size: usize,
}

impl<'a> Iterator for LengthPrefixedNals<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + self.length_size > self.data.len() {
            return None;
        }

        let nal_len = self.data[self.pos..self.pos + self.length_size]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        let start = self.pos + self.length_size;
        let end = start.checked_add(nal_len)?;
        if end > self.data.len() {
            // 截断的 NAL 不返回, 后续数据也无法再定位
            self.pos = self.data.len();
            return None;
        }

        self.pos = end;
        Some(&self.data[start..end])
    }
}

/// 按 `length_size` 字节的大端长度前缀切分样本中的 NAL 单元
///
/// `length_size` 必须在 1..=4 之间, 否则直接返回空迭代.
/// 遇到声明长度超出剩余数据的单元时停止.
pub fn split_length_prefixed(data: &[u8], length_size: usize) -> LengthPrefixedNals<'_> {
    let data = if (1..=4).contains(&length_size) {
        data
    } else {
        &[]
    };
    LengthPrefixedNals {
        data,
        pos: 0,
        length_size: length_size.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_type_create() {
        assert_eq!(NalUnitType::from_type_id(7), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_type_id(8), NalUnitType::Pps);
        assert_eq!(NalUnitType::from_type_id(5), NalUnitType::SliceIdr);
        assert_eq!(NalUnitType::from_type_id(1), NalUnitType::Slice);
        assert_eq!(NalUnitType::from_type_id(20), NalUnitType::SliceExtension);
        assert_eq!(NalUnitType::from_type_id(0x67), NalUnitType::Sps, "应只看低 5 位");
        assert_eq!(NalUnitType::from_type_id(17), NalUnitType::Unknown(17));
    }

    #[test]
    fn test_nal_type_type_id() {
        for id in 0..32 {
            let nt = NalUnitType::from_type_id(id);
            assert_eq!(nt.type_id(), id);
        }
    }

    #[test]
    fn test_nal_type_property() {
        assert!(NalUnitType::SliceIdr.is_idr());
        assert!(!NalUnitType::Slice.is_idr());
        assert!(NalUnitType::SliceExtension.is_mvc_slice());
        assert!(NalUnitType::SliceExtensionDepth.is_mvc_slice());
        assert!(!NalUnitType::SliceIdr.is_mvc_slice());
        assert_eq!(format!("{}", NalUnitType::Unknown(23)), "Unknown(23)");
    }

    #[test]
    fn test_nal_header_parse() {
        // forbidden=0, ref_idc=3, type=7 (SPS): 0b0_11_00111 = 0x67
        let header = NalHeader::parse(&[0x67, 0x42]).unwrap();
        assert!(!header.forbidden_zero_bit);
        assert_eq!(header.ref_idc, 3);
        assert_eq!(header.nal_type, NalUnitType::Sps);

        let header = NalHeader::from_byte(0xE5);
        assert!(header.forbidden_zero_bit);
        assert_eq!(header.nal_type, NalUnitType::SliceIdr);
    }

    #[test]
    fn test_nal_header_empty_data_error() {
        let err = NalHeader::parse(&[]).expect_err("空数据应返回错误");
        assert!(err.is_bad_data());
    }

    #[test]
    fn test_split_length_prefixed() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x03, 0x65, 0xAA, 0xBB]);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x02, 0x41, 0xCC]);

        let nals: Vec<&[u8]> = split_length_prefixed(&data, 4).collect();
        assert_eq!(nals, vec![&[0x65, 0xAA, 0xBB][..], &[0x41, 0xCC][..]]);
    }

    #[test]
    fn test_split_length_prefixed_two_byte_prefix() {
        let data = [0x00, 0x01, 0x09, 0x00, 0x02, 0x41, 0x9A];
        let nals: Vec<&[u8]> = split_length_prefixed(&data, 2).collect();
        assert_eq!(nals.len(), 2);
        assert_eq!(nals[1], &[0x41, 0x9A]);
    }

    #[test]
    fn test_split_length_prefixed_stops_at_truncated_unit() {
        let data = [0x00, 0x00, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00, 0x08, 0x41];
        let nals: Vec<&[u8]> = split_length_prefixed(&data, 4).collect();
        assert_eq!(nals, vec![&[0x09][..]], "截断的 NAL 不应返回");
    }

    #[test]
    fn test_split_length_prefixed_reject_invalid_length_size() {
        let data = [0x00, 0x00, 0x00, 0x02, 0x67, 0xAA];
        assert_eq!(
            split_length_prefixed(&data, 0).count(),
            0,
            "length_size=0 应直接返回空结果, 避免死循环"
        );
        assert_eq!(
            split_length_prefixed(&data, 5).count(),
            0,
            "length_size>4 应直接返回空结果"
        );
    }
}
