use super::*;
use log::debug;
use std::rc::Rc;

/// Registry growth bound before dead entries are dropped.
pub(crate) const HEAP_COMPACTION_THRESHOLD: usize = 4096;

/// Objects are shared via Rc, which cannot reclaim the cycles the object
/// graph is full of (constructor <-> prototype, arguments.callee, closures
/// holding the scope that holds them). Every allocation is therefore
/// registered weakly, and interpreter teardown sweeps the registry and strips
/// the survivors' slots so the cycles fall apart and the Rcs drain.
impl Interpreter {
    pub(crate) fn register_object(&mut self, obj: &ObjectRef) {
        if self.heap.len() >= self.heap_compact_at {
            self.compact_heap();
        }
        self.heap.push(Rc::downgrade(obj));
    }

    fn compact_heap(&mut self) {
        let before = self.heap.len();
        self.heap.retain(|weak| weak.strong_count() > 0);
        self.heap_compact_at = (self.heap.len() * 2).max(HEAP_COMPACTION_THRESHOLD);
        debug!("heap compaction: {before} -> {} registered objects", self.heap.len());
    }

    /// Number of objects currently alive (still strongly referenced).
    pub fn live_objects(&self) -> usize {
        self.heap.iter().filter(|weak| weak.strong_count() > 0).count()
    }

    fn teardown_sweep(&mut self) {
        let mut cleared = 0usize;
        for weak in self.heap.drain(..) {
            if let Some(obj) = weak.upgrade() {
                obj.borrow_mut().clear_for_teardown();
                cleared += 1;
            }
        }
        debug!("teardown sweep cleared {cleared} objects");
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.teardown_sweep();
    }
}
