//! Round-robin selection over a class's pools.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::registry::pool::PoolId;

/// Round-robin selector.
/// Stores the position after the last chosen pool, so skipping an
/// ineligible pool does not hand its share to the next one.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next pool in cyclic order that passes `eligible`, advancing the
    /// cursor past it.
    pub fn next_eligible<F>(&self, members: &[PoolId], eligible: F) -> Option<PoolId>
    where
        F: Fn(PoolId) -> bool,
    {
        if members.is_empty() {
            return None;
        }

        let mut current = self.next.load(Ordering::Acquire);
        loop {
            let chosen = scan(members, current, &eligible)?;
            let after = (chosen + 1) % members.len();
            match self
                .next
                .compare_exchange_weak(current, after, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(members[chosen]),
                Err(actual) => current = actual,
            }
        }
    }

    /// Pool [`next_eligible`](Self::next_eligible) would return, without
    /// moving the cursor.
    pub fn peek_eligible<F>(&self, members: &[PoolId], eligible: F) -> Option<PoolId>
    where
        F: Fn(PoolId) -> bool,
    {
        if members.is_empty() {
            return None;
        }
        scan(members, self.next.load(Ordering::Acquire), &eligible).map(|i| members[i])
    }
}

/// Index of the first eligible member at or after `start`, wrapping.
fn scan<F>(members: &[PoolId], start: usize, eligible: &F) -> Option<usize>
where
    F: Fn(PoolId) -> bool,
{
    let len = members.len();
    (0..len)
        .map(|i| (start + i) % len)
        .find(|&i| eligible(members[i]))
}
