pub mod clock_ring;
pub mod ghost_list;
pub mod shard;
pub mod slot_arena;

pub use clock_ring::ClockRing;
pub use ghost_list::GhostList;
pub use shard::ShardSelector;
pub use slot_arena::{SlotArena, SlotId};
