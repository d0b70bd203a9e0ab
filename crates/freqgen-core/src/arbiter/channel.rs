//! Channel half of the resource arbiter.
//!
//! A slot's state is a tagged variant (`Free` / `Primary { mem_blocks }` /
//! `Lent`) rather than a bare status byte plus a `mem_blocks` field that
//! only means something in one of the three states — the block count has
//! nowhere to be a meaningless sentinel.

use crate::error::FreqGenError;

/// Number of RMT-style channels in the pool.
pub const CHANNEL_COUNT: usize = 8;

/// Highest channel index can claim this many contiguous blocks (itself plus
/// every channel above it).
pub const MAX_MEM_BLOCKS: u8 = CHANNEL_COUNT as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    /// The primary channel of an active generator, owning `mem_blocks`
    /// contiguous blocks starting at this channel.
    Primary { mem_blocks: u8 },
    /// Memory lent to an active lower-numbered neighbor.
    Lent,
}

/// Fixed pool of 8 channel slots with contiguous-block chaining.
pub struct ChannelPool {
    slots: [Slot; CHANNEL_COUNT],
}

impl ChannelPool {
    pub const fn new() -> Self {
        Self { slots: [Slot::Free; CHANNEL_COUNT] }
    }

    /// Count of consecutive free slots starting at `c` and extending
    /// upward through channel 7.
    fn avail(&self, c: usize) -> usize {
        let mut n = 0;
        for slot in &self.slots[c..] {
            if *slot == Slot::Free {
                n += 1;
            } else {
                break;
            }
        }
        n
    }

    /// Scans channel indices highest-to-lowest, picking the first channel
    /// whose contiguous free run can satisfy `need` blocks. Leaves the
    /// widest low-channel runs free for future large, buffer-hungry
    /// requests.
    pub fn alloc(&mut self, need: u8) -> Result<u8, FreqGenError> {
        if need == 0 || need > MAX_MEM_BLOCKS {
            return Err(FreqGenError::InvalidArg("block count out of range"));
        }
        for c in (0..CHANNEL_COUNT).rev() {
            if self.slots[c] == Slot::Free && self.avail(c) >= need as usize {
                self.slots[c] = Slot::Primary { mem_blocks: need };
                for j in c + 1..c + need as usize {
                    self.slots[j] = Slot::Lent;
                }
                log::debug!("channel: allocated {c} with {need} block(s)");
                return Ok(c as u8);
            }
        }
        Err(FreqGenError::NoMem("no channel run wide enough"))
    }

    /// No-op on a free or lent slot; otherwise releases the primary's
    /// block run back to free.
    pub fn free(&mut self, channel: u8) {
        let c = channel as usize;
        if c >= CHANNEL_COUNT {
            return;
        }
        if let Slot::Primary { mem_blocks } = self.slots[c] {
            log::debug!("channel: freeing {c} and its {mem_blocks} block(s)");
            for j in c..c + mem_blocks as usize {
                self.slots[j] = Slot::Free;
            }
        }
    }

    pub fn mem_blocks_of(&self, channel: u8) -> Option<u8> {
        match self.slots.get(channel as usize) {
            Some(Slot::Primary { mem_blocks }) => Some(*mem_blocks),
            _ => None,
        }
    }
}

impl Default for ChannelPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_to_low_allocation_then_free_then_realloc() {
        let mut pool = ChannelPool::new();
        assert_eq!(pool.alloc(1).unwrap(), 7);
        assert_eq!(pool.alloc(3).unwrap(), 4);
        assert!(pool.alloc(5).is_err());
        pool.free(4);
        assert_eq!(pool.alloc(4).unwrap(), 3);
    }

    #[test]
    fn free_restores_exactly_the_claimed_run() {
        let mut pool = ChannelPool::new();
        let c = pool.alloc(4).unwrap();
        assert_eq!(c, 4);
        assert_eq!(pool.mem_blocks_of(4), Some(4));
        pool.free(4);
        assert_eq!(pool.mem_blocks_of(4), None);
        // The whole pool is free again; a full 8-block allocation fits.
        assert_eq!(pool.alloc(8).unwrap(), 0);
    }

    #[test]
    fn freeing_a_lent_or_free_slot_is_a_no_op() {
        let mut pool = ChannelPool::new();
        pool.alloc(3).unwrap(); // claims 5, 6, 7
        pool.free(6); // 6 is Lent, not Primary
        assert_eq!(pool.mem_blocks_of(5), Some(3));
        pool.free(2); // already Free
        assert_eq!(pool.alloc(1).unwrap(), 4);
    }

    #[test]
    fn rejects_out_of_range_request() {
        let mut pool = ChannelPool::new();
        assert!(pool.alloc(0).is_err());
        assert!(pool.alloc(9).is_err());
    }

    #[test]
    fn no_slot_is_simultaneously_used_and_lent_to_another_used_slot() {
        let mut pool = ChannelPool::new();
        let a = pool.alloc(3).unwrap();
        let b = pool.alloc(2).unwrap();
        let a_blocks = pool.mem_blocks_of(a).unwrap();
        let b_blocks = pool.mem_blocks_of(b).unwrap();
        for j in a + 1..a + a_blocks {
            assert_eq!(pool.mem_blocks_of(j), None, "slot {j} lent to {a} must not also be primary");
        }
        for j in b + 1..b + b_blocks {
            assert_eq!(pool.mem_blocks_of(j), None, "slot {j} lent to {b} must not also be primary");
        }
        let (a_start, a_end) = (a, a + a_blocks);
        let (b_start, b_end) = (b, b + b_blocks);
        assert!(a_end <= b_start || b_end <= a_start, "claimed ranges must not overlap");
    }
}
