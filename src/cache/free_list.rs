//! Intrusive LIFO stack of idle packet bodies

use crate::buffers::PacketBody;

/// Idle packets of one cache, linked through their own `next` field
///
/// `count` always equals the number of bodies reachable from `head`.
#[derive(Default)]
pub(crate) struct FreeList {
    head: Option<Box<PacketBody>>,
    count: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            count: 0,
        }
    }

    pub(crate) fn push(&mut self, mut body: Box<PacketBody>) {
        body.next = self.head.take();
        self.head = Some(body);
        self.count += 1;
    }

    pub(crate) fn pop(&mut self) -> Option<Box<PacketBody>> {
        let mut body = self.head.take()?;
        self.head = body.next.take();
        self.count -= 1;
        Some(body)
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Detach the whole list, leaving this one empty
    pub(crate) fn take(&mut self) -> FreeList {
        std::mem::take(self)
    }

    /// Walk the list: (reachable nodes, nodes whose payload is aliased)
    pub(crate) fn walk(&self) -> (usize, usize) {
        let mut reachable = 0;
        let mut shared = 0;
        let mut cursor = self.head.as_deref();
        while let Some(body) = cursor {
            reachable += 1;
            if std::sync::Arc::strong_count(&body.payload) != 1 {
                shared += 1;
            }
            cursor = body.next.as_deref();
        }
        (reachable, shared)
    }
}

impl Drop for FreeList {
    fn drop(&mut self) {
        // unlink iteratively, a recursive Box drop would overflow on long lists
        while self.pop().is_some() {}
    }
}
