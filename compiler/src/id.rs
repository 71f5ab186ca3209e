// id.rs — Handle allocators for engine-side resources
//
// Two allocation disciplines. Buffer handles index a small fixed pool on
// the engine, so released handles are reused and the top of the range is
// compacted to keep the live span dense. Node identifiers name running
// graph instances and are never reused within a session, so that
// dispenser only counts upward.

use std::collections::BTreeSet;

/// Handle into the engine's buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Identifier of a running graph instance on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i32);

/// First node id this client hands out. High enough to stay clear of the
/// low ids interactive tools claim for themselves.
pub const FIRST_NODE_ID: i32 = 0x100000;

/// Allocator for buffer handles. Released handles are reused before new
/// ones are issued, smallest first; releasing the top of the issued range
/// compacts any contiguous released run directly below it.
#[derive(Debug, Clone, Default)]
pub struct BufferAllocator {
    next_unused: u32,
    released: BTreeSet<u32>,
}

impl BufferAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest released handle, or the next unused one.
    pub fn acquire(&mut self) -> BufferId {
        if let Some(id) = self.released.pop_first() {
            return BufferId(id);
        }
        let id = self.next_unused;
        self.next_unused += 1;
        BufferId(id)
    }

    /// Return a handle to the pool.
    ///
    /// Preconditions: `id` was issued by this allocator and is not already
    /// released. Violations are caller defects, caught in debug builds.
    pub fn release(&mut self, id: BufferId) {
        debug_assert!(
            id.0 < self.next_unused,
            "release of unissued handle {}",
            id.0
        );
        debug_assert!(
            !self.released.contains(&id.0),
            "double release of handle {}",
            id.0
        );
        if id.0 + 1 == self.next_unused {
            self.next_unused = id.0;
            while self.next_unused > 0 && self.released.remove(&(self.next_unused - 1)) {
                self.next_unused -= 1;
            }
        } else {
            self.released.insert(id.0);
        }
    }

    /// Upper bound of the issued range; every issued handle is below this.
    pub fn next_unused(&self) -> u32 {
        self.next_unused
    }

    /// Number of handles parked for reuse.
    pub fn released_len(&self) -> usize {
        self.released.len()
    }
}

/// Dispenser for engine node identifiers. Monotonic from
/// [`FIRST_NODE_ID`]; a freed id is never handed out again.
#[derive(Debug, Clone)]
pub struct NodeIdAllocator {
    next: i32,
}

impl Default for NodeIdAllocator {
    fn default() -> Self {
        NodeIdAllocator {
            next: FIRST_NODE_ID,
        }
    }
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}
