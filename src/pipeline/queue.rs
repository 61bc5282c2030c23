//! Bounded work queue between the producer and the consumer pool
//!
//! Items carry fully loaded image bytes, so the queue capacity is what
//! bounds memory: `put` blocks while the queue is full and `take` blocks
//! while it is empty.
//!
//! Termination uses counted sentinels. The producer puts exactly one
//! [`WorkItem::Sentinel`] per consumer after the last real item; each
//! consumer stops at the first sentinel it takes and never forwards it.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 250;

/// An image staged in memory, waiting for a consumer
#[derive(Debug, Clone)]
pub struct StagedImage {
    /// Document id
    pub id: String,

    /// Document title
    pub title: String,

    /// Extra document fields supplied by the source
    pub fields: BTreeMap<String, String>,

    /// Raw encoded image bytes
    pub bytes: Vec<u8>,
}

impl StagedImage {
    /// Create a staged image whose title is its id
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            fields: BTreeMap::new(),
            bytes,
        }
    }
}

/// Unit of work passed through the queue
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// A real image to index
    Image(StagedImage),

    /// Tells exactly one consumer to stop
    Sentinel,
}

impl WorkItem {
    /// Returns true for the termination marker
    pub fn is_sentinel(&self) -> bool {
        matches!(self, WorkItem::Sentinel)
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total real items enqueued
    pub enqueued: AtomicU64,

    /// Total real items dequeued
    pub dequeued: AtomicU64,

    /// Sentinels enqueued
    pub sentinels_sent: AtomicU64,

    /// Sentinels taken by consumers
    pub sentinels_taken: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued real items)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get number of sentinels put so far
    pub fn sentinels_sent(&self) -> u64 {
        self.sentinels_sent.load(Ordering::Relaxed)
    }

    /// Get number of sentinels taken so far
    pub fn sentinels_taken(&self) -> u64 {
        self.sentinels_taken.load(Ordering::Relaxed)
    }
}

/// Bounded FIFO of work items
pub struct WorkQueue {
    /// Sender for adding items
    sender: Sender<WorkItem>,

    /// Receiver for taking items
    receiver: Receiver<WorkItem>,

    /// Queue capacity
    capacity: usize,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender for this queue (the producer's end)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver for this queue (clone for each consumer)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Handle for putting items into the queue
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<WorkItem>,
    stats: Arc<QueueStats>,
}

impl WorkQueueSender {
    /// Put an item, blocking while the queue is full
    ///
    /// Returns `Err` only if every receiver has been dropped.
    pub fn put(&self, item: WorkItem) -> Result<(), ()> {
        let sentinel = item.is_sentinel();
        self.sender.send(item).map_err(|_| ())?;
        if sentinel {
            self.stats.sentinels_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Put one sentinel per consumer
    pub fn put_sentinels(&self, consumers: usize) -> Result<(), ()> {
        for _ in 0..consumers {
            self.put(WorkItem::Sentinel)?;
        }
        Ok(())
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

/// Handle for taking items from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<WorkItem>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Take the next item, blocking while the queue is empty
    ///
    /// Returns `None` if the queue is empty and every sender is gone.
    pub fn take(&self) -> Option<WorkItem> {
        let item = self.receiver.recv().ok()?;
        if item.is_sentinel() {
            self.stats.sentinels_taken.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        Some(item)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    fn image(id: &str) -> WorkItem {
        WorkItem::Image(StagedImage::new(id, vec![0u8; 4]))
    }

    #[test]
    fn test_queue_fifo() {
        let queue = WorkQueue::new(10);
        let sender = queue.sender();
        let receiver = queue.receiver();

        sender.put(image("a")).unwrap();
        sender.put(image("b")).unwrap();
        sender.put(WorkItem::Sentinel).unwrap();
        assert_eq!(queue.len(), 3);

        match receiver.take() {
            Some(WorkItem::Image(img)) => assert_eq!(img.id, "a"),
            other => panic!("unexpected item: {:?}", other),
        }
        match receiver.take() {
            Some(WorkItem::Image(img)) => assert_eq!(img.id, "b"),
            other => panic!("unexpected item: {:?}", other),
        }
        assert!(receiver.take().unwrap().is_sentinel());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_put_blocks_when_full() {
        let queue = WorkQueue::new(2);
        let sender = queue.sender();
        let receiver = queue.receiver();

        let producer = thread::spawn(move || {
            for i in 0..5 {
                sender.put(image(&i.to_string())).unwrap();
            }
        });

        thread::sleep(Duration::from_millis(100));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.stats().enqueued.load(Ordering::Relaxed), 2);

        for _ in 0..5 {
            receiver.take().unwrap();
        }
        producer.join().unwrap();
        assert_eq!(queue.stats().throughput(), 5);
    }

    #[test]
    fn test_each_item_delivered_once() {
        let consumers = 4;
        let items = 200;
        let queue = WorkQueue::new(16);
        let sender = queue.sender();

        let handles: Vec<_> = (0..consumers)
            .map(|_| {
                let receiver = queue.receiver();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(item) = receiver.take() {
                        match item {
                            WorkItem::Image(img) => seen.push(img.id),
                            WorkItem::Sentinel => break,
                        }
                    }
                    seen
                })
            })
            .collect();

        for i in 0..items {
            sender.put(image(&i.to_string())).unwrap();
        }
        sender.put_sentinels(consumers).unwrap();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), items);
        assert_eq!(unique.len(), items);

        let stats = queue.stats();
        assert_eq!(stats.sentinels_sent(), consumers as u64);
        assert_eq!(stats.sentinels_taken(), consumers as u64);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_after_senders_dropped() {
        let queue = WorkQueue::new(4);
        let receiver = queue.receiver();
        drop(queue);
        assert!(receiver.take().is_none());
    }
}
