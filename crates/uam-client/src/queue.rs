//! FIFO buffer between `allocate_async` callers and the heartbeat worker.
//!
//! Producers never block; the single consumer parks on a notify when the
//! queue is empty. Requests pushed before registration completes stay
//! buffered until the worker starts draining.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::records::{AllocateRequest, AllocateResponse};

pub(crate) type AllocateCallback = Box<dyn FnOnce(AllocateResponse) + Send + 'static>;

/// An allocate request paired with its completion callback. Both are
/// present by construction.
pub(crate) struct PendingAllocate {
    pub request: AllocateRequest,
    pub callback: AllocateCallback,
}

pub(crate) struct RequestQueue {
    items: Mutex<VecDeque<PendingAllocate>>,
    notify: Notify,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Enqueue an item. Never blocks.
    pub fn push(&self, item: PendingAllocate) {
        self.items.lock().expect("queue lock poisoned").push_back(item);
        self.notify.notify_one();
    }

    /// Dequeue the next item, waiting while the queue is empty.
    ///
    /// Cancel safe: an item is removed only on the poll that returns it.
    pub async fn take(&self) -> PendingAllocate {
        loop {
            if let Some(item) = self
                .items
                .lock()
                .expect("queue lock poisoned")
                .pop_front()
            {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue lock poisoned").len()
    }
}
