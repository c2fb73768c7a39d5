//! Tenant → shard mapping.
//!
//! `shard = (tenant_id - 1) mod shard_count`, with a Euclidean remainder so
//! tenant 0 and negative IDs still land in range. The map only stores which
//! pool owns each shard; health is consulted by the registry per call.

use std::ops::RangeInclusive;

use crate::registry::pool::{Pool, PoolId};

/// Shard ownership table for one service class.
///
/// Ownership is kept as ranges sorted by start, so a pool claiming a huge
/// range costs one entry rather than one slot per shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardMap {
    shard_count: u64,
    ranges: Vec<(RangeInclusive<u32>, PoolId)>,
}

impl ShardMap {
    /// Build the table for the pools of one class, in configuration order.
    ///
    /// If any pool declares a shard range, the shard count is the highest
    /// claimed index plus one and unclaimed indices have no owner. Otherwise
    /// pool *i* owns shard *i*.
    pub fn from_pools(pools: &[&Pool]) -> Option<Self> {
        if pools.is_empty() {
            return None;
        }

        let ranged = pools.iter().any(|p| p.shard_range.is_some());
        if !ranged {
            return Some(Self {
                shard_count: pools.len() as u64,
                ranges: pools
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i as u32..=i as u32, p.id))
                    .collect(),
            });
        }

        let mut ranges: Vec<(RangeInclusive<u32>, PoolId)> = pools
            .iter()
            .filter_map(|p| p.shard_range.clone().map(|r| (r, p.id)))
            .collect();
        ranges.sort_by_key(|(r, _)| *r.start());
        let shard_count = ranges.iter().map(|(r, _)| u64::from(*r.end()) + 1).max()?;

        Some(Self { shard_count, ranges })
    }

    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    /// Shard index for a tenant.
    pub fn shard_for(&self, tenant_id: i64) -> u32 {
        let count = self.shard_count.max(1) as i128;
        (i128::from(tenant_id) - 1).rem_euclid(count) as u32
    }

    /// Pool owning `shard`, if any.
    pub fn owner(&self, shard: u32) -> Option<PoolId> {
        // Last range starting at or before the shard; validation rejects
        // overlaps, so no earlier range can contain it.
        let idx = self.ranges.partition_point(|(r, _)| *r.start() <= shard);
        let (range, id) = self.ranges.get(idx.checked_sub(1)?)?;
        range.contains(&shard).then_some(*id)
    }

    /// Owning pool for a tenant, if its shard is claimed.
    pub fn owner_for(&self, tenant_id: i64) -> Option<PoolId> {
        self.owner(self.shard_for(tenant_id))
    }
}
