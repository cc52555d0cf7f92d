//! 按 ID 索引的 SPS/PPS 存储.
//!
//! 表按需增长, 新增槽位为空. ID 上限 (SPS 32, PPS 256) 同时限制了内存占用.
//! 重新解析同一 ID 时先清空槽位再整体写入, 解析失败的槽位保持为空.

use avcut_core::{AvcError, AvcResult};

use super::pps::Pps;
use super::sps::Sps;

/// SPS ID 上限 (不含)
pub const MAX_SPS_COUNT: u32 = 32;
/// PPS ID 上限 (不含)
pub const MAX_PPS_COUNT: u32 = 256;

/// 单类参数集的 ID 索引表
#[derive(Debug, Clone)]
pub struct ParameterSetTable<T> {
    /// 参数集名称, 用于错误信息 (如 "sps")
    kind: &'static str,
    /// ID 上限 (不含)
    limit: u32,
    slots: Vec<Option<T>>,
}

impl<T> ParameterSetTable<T> {
    /// 创建空表
    pub fn new(kind: &'static str, limit: u32) -> Self {
        Self {
            kind,
            limit,
            slots: Vec::new(),
        }
    }

    /// 按 ID 查找, 越界或未解析时返回 None
    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// 已解析的参数集个数
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// 表是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按 ID 升序遍历已解析的参数集
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|value| (id as u32, value)))
    }

    /// 校验 ID 并清空对应槽位, 必要时扩展表
    ///
    /// ID 超出上限返回 [`AvcError::BadData`], 扩展失败返回 [`AvcError::AllocationFailed`].
    pub fn reset_slot(&mut self, id: u32) -> AvcResult<()> {
        if id >= self.limit {
            return Err(AvcError::BadData(format!(
                "H264: {}_id 超出范围, {}_id={}",
                self.kind, self.kind, id
            )));
        }

        let index = id as usize;
        if index >= self.slots.len() {
            let additional = index + 1 - self.slots.len();
            self.slots.try_reserve(additional).map_err(|_| {
                AvcError::AllocationFailed(format!(
                    "H264: {} 表扩展失败, {}_id={}",
                    self.kind, self.kind, id
                ))
            })?;
            self.slots.resize_with(index + 1, || None);
        }

        self.slots[index] = None;
        Ok(())
    }

    /// 写入已校验过的槽位
    ///
    /// 必须先调用 [`ParameterSetTable::reset_slot`].
    pub fn fill_slot(&mut self, id: u32, value: T) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = Some(value);
        }
    }
}

/// SPS 表与 PPS 表
#[derive(Debug, Clone)]
pub struct ParameterSetStore {
    /// SPS 表
    pub sps: ParameterSetTable<Sps>,
    /// PPS 表
    pub pps: ParameterSetTable<Pps>,
}

impl ParameterSetStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self {
            sps: ParameterSetTable::new("sps", MAX_SPS_COUNT),
            pps: ParameterSetTable::new("pps", MAX_PPS_COUNT),
        }
    }
}

impl Default for ParameterSetStore {
    fn default() -> Self {
        Self::new()
    }
}
