//! 分片路由与 ID 生成
//!
//! 用户 ID 的高位是毫秒时间戳，ShardRouter 右移去掉节点号和序列号后对分片数取模。

use parking_lot::Mutex;

use crate::error::{GameError, Result};

/// 分片路由
///
/// 纯函数，相同输入总是得到相同分片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    shard_count: usize,
    sequence_bits: u32,
}

impl ShardRouter {
    pub fn new(shard_count: usize, sequence_bits: u32) -> Result<Self> {
        if shard_count == 0 {
            return Err(GameError::Internal("分片数不能为 0".to_string()));
        }
        if sequence_bits >= 64 {
            return Err(GameError::Internal(format!(
                "sequence_bits 超出范围: {sequence_bits}"
            )));
        }
        Ok(Self {
            shard_count,
            sequence_bits,
        })
    }

    /// 计算用户所在分片，结果在 `[0, shard_count)` 内
    pub fn route(&self, user_id: i64) -> usize {
        if self.shard_count == 1 {
            return 0;
        }
        (((user_id as u64) >> self.sequence_bits) % self.shard_count as u64) as usize
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }
}

const EPOCH_MS: i64 = 1_704_067_200_000;
const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;

/// 按时间有序的 64 位 ID 生成器
///
/// 布局：41 位毫秒时间戳 | 10 位节点号 | 12 位序列号。
/// 同一毫秒序列号用尽时逻辑时钟前进一毫秒，保证单调递增。
#[derive(Debug)]
pub struct IdGenerator {
    node_id: i64,
    state: Mutex<(i64, i64)>,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Result<Self> {
        if i64::from(node_id) >= 1 << NODE_BITS {
            return Err(GameError::Internal(format!("节点号超出范围: {node_id}")));
        }
        Ok(Self {
            node_id: i64::from(node_id),
            state: Mutex::new((0, 0)),
        })
    }

    pub fn next_id(&self) -> i64 {
        let now_ms = chrono::Utc::now().timestamp_millis() - EPOCH_MS;
        let mut state = self.state.lock();
        let (last_ms, sequence) = *state;

        let (ms, seq) = if now_ms > last_ms {
            (now_ms, 0)
        } else if sequence < MAX_SEQUENCE {
            (last_ms, sequence + 1)
        } else {
            (last_ms + 1, 0)
        };
        *state = (ms, seq);

        (ms << (NODE_BITS + SEQUENCE_BITS)) | (self.node_id << SEQUENCE_BITS) | seq
    }
}
