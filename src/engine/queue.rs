use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::orderbook::types::{Order, OrderId};

/// Default ring capacity (2^16 events).
pub const DEFAULT_CAPACITY: usize = 65_536;

/// Submission events consumed by the matching engine thread.
#[derive(Debug)]
pub enum OrderEvent {
    NewOrder(Arc<Order>),
    CancelOrder(OrderId),
    ReplaceOrder {
        old_order_id: OrderId,
        order: Arc<Order>,
    },
    Shutdown,
}

/// Wait-free bounded single-producer/single-consumer ring of [`OrderEvent`]s.
///
/// Capacity must be a power of two so index wrap is a bitmask; one slot is
/// sacrificed to distinguish full from empty, so `capacity - 1` events can be
/// in flight. Head and tail live on separate cache lines. The producer
/// publishes payload-then-tail with a release store; the consumer acquires
/// tail before reading the slot, and symmetrically for head.
///
/// The single-producer/single-consumer contract is enforced at the type
/// level: [`EventQueue::with_capacity`] hands out exactly one producer and
/// one consumer handle, neither of which is cloneable, and both `push` and
/// `pop` take `&mut self`.
pub struct EventQueue;

impl EventQueue {
    /// Ring with the default capacity.
    pub fn new() -> (EventProducer, EventConsumer) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Ring with the given power-of-two capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two greater than one.
    pub fn with_capacity(capacity: usize) -> (EventProducer, EventConsumer) {
        assert!(
            capacity.is_power_of_two() && capacity > 1,
            "queue capacity must be a power of two > 1"
        );
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let ring = Arc::new(Ring {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            mask: capacity - 1,
            slots,
        });
        (
            EventProducer {
                ring: Arc::clone(&ring),
            },
            EventConsumer { ring },
        )
    }
}

struct Ring {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    mask: usize,
    slots: Box<[UnsafeCell<MaybeUninit<OrderEvent>>]>,
}

// The protocol guarantees a slot is accessed by exactly one side at a time:
// the producer writes slots in [tail, head) and the consumer reads slots in
// [head, tail), with the release/acquire pair ordering the handoff.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) & self.mask
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        // Both handles are gone; drop any events still in flight.
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        while head != tail {
            unsafe { (*self.slots[head].get()).assume_init_drop() };
            head = (head + 1) & self.mask;
        }
    }
}

/// Producer half of the queue. `Send` but not `Clone`.
pub struct EventProducer {
    ring: Arc<Ring>,
}

impl EventProducer {
    /// Publish an event. Returns `false` if the queue is full; the producer
    /// never blocks, and the event is dropped on failure.
    pub fn push(&mut self, event: OrderEvent) -> bool {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let next = (tail + 1) & ring.mask;
        if next == ring.head.load(Ordering::Acquire) {
            return false; // queue full
        }
        unsafe { (*ring.slots[tail].get()).write(event) };
        ring.tail.store(next, Ordering::Release);
        true
    }

    /// Approximate number of queued events, always within `[0, capacity]`.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer half of the queue. `Send` but not `Clone`.
pub struct EventConsumer {
    ring: Arc<Ring>,
}

impl EventConsumer {
    /// Take the oldest event, or `None` if the queue is currently empty.
    /// Never blocks.
    pub fn pop(&mut self) -> Option<OrderEvent> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        if head == ring.tail.load(Ordering::Acquire) {
            return None; // queue empty
        }
        let event = unsafe { (*ring.slots[head].get()).assume_init_read() };
        ring.head.store((head + 1) & ring.mask, Ordering::Release);
        Some(event)
    }

    /// Approximate number of queued events, always within `[0, capacity]`.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
