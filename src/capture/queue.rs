//! FIFO correlation between `take_picture` calls and delivered pictures.

use super::request::{CaptureId, CaptureOptions, CaptureRequest, PendingCapture};
use crate::assert_invariant;
use crate::errors::CaptureError;
use crate::invariant_ppt::invariants;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

struct Entry {
    seq: u64,
    request: CaptureRequest,
}

#[derive(Default)]
struct QueueState {
    order: VecDeque<CaptureId>,
    table: HashMap<CaptureId, Entry>,
    next_seq: u64,
    last_popped: Option<u64>,
}

/// Pending still captures in submission order.
///
/// The order and the request table share one lock, so popping the oldest id
/// and taking its request out of the table is a single step.
#[derive(Default)]
pub struct CaptureRequestQueue {
    state: Mutex<QueueState>,
}

impl CaptureRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, request: CaptureRequest) -> CaptureId {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let id = request.id;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.push_back(id);
        state.table.insert(id, Entry { seq, request });
        log::debug!("capture {} queued ({} pending)", id, state.order.len());
        id
    }

    /// Create and enqueue a request, returning the caller's handle.
    pub fn submit(&self, options: CaptureOptions, destination: impl Into<PathBuf>) -> PendingCapture {
        let (request, pending) = CaptureRequest::new(options, destination);
        self.enqueue(request);
        pending
    }

    /// Take a request out of the queue regardless of its position.
    pub fn remove(&self, id: CaptureId) -> Option<CaptureRequest> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.table.remove(&id)?;
        state.order.retain(|queued| *queued != id);
        Some(entry.request)
    }

    /// Pop the oldest pending request.
    ///
    /// An empty queue means a picture arrived that nobody asked for; that is
    /// reported as `QueueDesynchronization`, never skipped.
    pub fn pop_oldest(&self) -> Result<CaptureRequest, CaptureError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(id) = state.order.pop_front() else {
            log::error!("picture delivered with no pending capture request");
            return Err(CaptureError::QueueDesynchronization);
        };
        let Some(entry) = state.table.remove(&id) else {
            log::error!("capture {} was queued without a table entry", id);
            return Err(CaptureError::QueueDesynchronization);
        };

        assert_invariant!(
            state.last_popped.map_or(true, |last| entry.seq > last),
            invariants::CAPTURE_POPPED_IN_ORDER,
            "capture::queue"
        );
        state.last_popped = Some(entry.seq);
        Ok(entry.request)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: CaptureId) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .table
            .contains_key(&id)
    }

    /// Reject every pending request with `Cancelled`.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<CaptureRequest> = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.order.clear();
            state.table.drain().map(|(_, entry)| entry.request).collect()
        };
        let count = drained.len();
        for request in drained {
            request.resolver.resolve(Err(CaptureError::Cancelled));
        }
        if count > 0 {
            log::info!("cancelled {} pending capture(s)", count);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_in_submission_order() {
        let queue = CaptureRequestQueue::new();
        let ids: Vec<_> = (0..3)
            .map(|_| queue.submit(CaptureOptions::default(), "/tmp").id())
            .collect();
        for id in ids {
            assert_eq!(queue.pop_oldest().unwrap().id, id);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_pop_is_desync() {
        let queue = CaptureRequestQueue::new();
        assert_eq!(queue.pop_oldest().unwrap_err(), CaptureError::QueueDesynchronization);
    }

    #[test]
    fn test_remove_from_middle_keeps_order() {
        let queue = CaptureRequestQueue::new();
        let a = queue.submit(CaptureOptions::default(), "/tmp").id();
        let b = queue.submit(CaptureOptions::default(), "/tmp").id();
        let c = queue.submit(CaptureOptions::default(), "/tmp").id();

        assert!(queue.remove(b).is_some());
        assert!(queue.remove(b).is_none());
        assert!(!queue.contains(b));
        assert_eq!(queue.pop_oldest().unwrap().id, a);
        assert_eq!(queue.pop_oldest().unwrap().id, c);
    }

    #[test]
    fn test_cancel_all_rejects_pending() {
        let queue = CaptureRequestQueue::new();
        let first = queue.submit(CaptureOptions::default(), "/tmp");
        let second = queue.submit(CaptureOptions::fast(), "/tmp");
        assert_eq!(queue.cancel_all(), 2);
        assert_eq!(first.blocking_wait(), Err(CaptureError::Cancelled));
        assert_eq!(second.blocking_wait(), Err(CaptureError::Cancelled));
        assert!(queue.is_empty());
    }
}
