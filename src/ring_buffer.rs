//! Wait-free SPSC ring buffer over fixed slot storage.
//!
//! # Overview
//! - Single producer, single consumer, fixed capacity `N - 1` (one slot is a sentinel so that
//!   "full" and "empty" can be told apart from the cursors alone).
//! - Neither side ever blocks: a full ring rejects the push, an empty ring yields `None`.
//! - No allocation, no CAS on the hot path, no retries.
//! - Elements may own resources; anything still queued when the ring is dropped is dropped in
//!   head-to-tail order.
//!
//! # Memory ordering
//! The producer writes slot `tail`, then release-stores the new `tail`. The consumer acquire-loads
//! `tail` before reading slot `head`, moves the value out, then release-stores the new `head`,
//! which the producer acquire-loads before reusing that slot. Each cursor has exactly one writer,
//! so the owner reads its own cursor with `Relaxed`.
//!
//! # Notes
//! - Running two producers (or two consumers) at once is undefined behavior. The handle API
//!   makes this hard to do by accident: handles are claimed one per side and push/pop take
//!   `&mut self`.
//! - `size_approx` reads two independently updated cursors and is only an estimate while either
//!   side is active.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use crossbeam_utils::CachePadded;

use crate::error::PushError;
use crate::sync::{AtomicBool, AtomicUsize, Ordering, UnsafeCell};

/// One storage cell. Whether it holds a live value is known only from the cursors.
struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    #[inline]
    fn vacant() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// # Safety
    /// The caller owns the slot and it holds no live value.
    #[inline]
    unsafe fn write(&self, value: T) {
        self.value.with_mut(|slot| unsafe {
            (*slot).write(value);
        });
    }

    /// Moves the value out, leaving the slot vacant.
    ///
    /// # Safety
    /// The caller owns the slot and it holds a live value.
    #[inline]
    unsafe fn take(&self) -> T {
        self.value.with_mut(|slot| unsafe { (*slot).assume_init_read() })
    }

    /// # Safety
    /// The slot holds a live value and nobody takes or drops it while the reference lives.
    #[inline]
    unsafe fn get(&self) -> &T {
        self.value.with(|slot| unsafe { (*slot).assume_init_ref() })
    }

    /// # Safety
    /// The caller owns the slot and it holds a live value.
    #[inline]
    unsafe fn drop_in_place(&self) {
        self.value
            .with_mut(|slot| unsafe { (*slot).assume_init_drop() });
    }
}

fn vacant_slots<T, const N: usize>() -> [Slot<T>; N] {
    core::array::from_fn(|_| Slot::vacant())
}

/// Fixed-capacity SPSC queue. Holds at most `N - 1` elements.
///
/// `N` must be at least 2; smaller values are rejected at compile time:
///
/// ```compile_fail
/// let ring = ph_ring::RingBuffer::<u8, 1>::new();
/// ```
pub struct RingBuffer<T, const N: usize> {
    /// Next slot to consume. Written by the consumer only.
    head: CachePadded<AtomicUsize>,
    /// Next slot to produce. Written by the producer only.
    tail: CachePadded<AtomicUsize>,
    producer_active: AtomicBool,
    consumer_active: AtomicBool,
    slots: CachePadded<[Slot<T>; N]>,
}

// SAFETY: a slot is only touched by the side that currently owns it per the `[head, tail)`
// invariant, and ownership moves across threads through the release/acquire cursor pair.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T, const N: usize> RingBuffer<T, N> {
    const VALID_CAPACITY: () = assert!(N >= 2, "RingBuffer capacity must be at least 2");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CAPACITY;
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            producer_active: AtomicBool::new(false),
            consumer_active: AtomicBool::new(false),
            slots: CachePadded::new(vacant_slots::<T, N>()),
        }
    }

    #[inline(always)]
    const fn next_index(idx: usize) -> usize {
        let next = idx + 1;
        if next == N { 0 } else { next }
    }

    /// Create the producer handle.
    ///
    /// # Panics
    /// If another producer handle is still alive.
    #[inline]
    pub fn producer(&self) -> Producer<'_, T, N> {
        match self.try_producer() {
            Some(producer) => producer,
            None => panic!("RingBuffer producer already active"),
        }
    }

    /// Create the producer handle, or `None` if one is already alive.
    #[inline]
    pub fn try_producer(&self) -> Option<Producer<'_, T, N>> {
        // Acquire pairs with the release in `Producer::drop`, so a handle created on another
        // thread sees the previous producer's last `tail`.
        if self.producer_active.swap(true, Ordering::Acquire) {
            return None;
        }
        Some(Producer { ring: self })
    }

    /// Create the consumer handle.
    ///
    /// # Panics
    /// If another consumer handle is still alive.
    #[inline]
    pub fn consumer(&self) -> Consumer<'_, T, N> {
        match self.try_consumer() {
            Some(consumer) => consumer,
            None => panic!("RingBuffer consumer already active"),
        }
    }

    /// Create the consumer handle, or `None` if one is already alive.
    #[inline]
    pub fn try_consumer(&self) -> Option<Consumer<'_, T, N>> {
        if self.consumer_active.swap(true, Ordering::Acquire) {
            return None;
        }
        Some(Consumer {
            ring: self,
            _not_sync: PhantomData,
        })
    }

    /// Usable slots, `N - 1`.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Best-effort element count. Exact only when neither side is running.
    #[inline]
    pub fn size_approx(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if tail >= head {
            tail - head
        } else {
            N - head + tail
        }
    }

    /// Snapshot; may be stale as soon as it returns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Snapshot; may be stale as soon as it returns.
    #[inline]
    pub fn is_full(&self) -> bool {
        Self::next_index(self.tail.load(Ordering::Acquire)) == self.head.load(Ordering::Acquire)
    }

    /// Drop every queued element and reset both cursors.
    ///
    /// Also clears stale handle claims left behind by forgotten handles.
    pub fn clear(&mut self) {
        // SAFETY: `&mut self` rules out any live handle.
        unsafe { self.clear_unsafe() };
        self.producer_active.store(false, Ordering::Relaxed);
        self.consumer_active.store(false, Ordering::Relaxed);
    }

    /// Drop every queued element and reset both cursors through a shared reference.
    ///
    /// # Safety
    /// No other thread may touch the ring (through a handle or otherwise) for the duration of
    /// the call, and the caller must have synchronized with both sides' last operations.
    pub unsafe fn clear_unsafe(&self) {
        let tail = self.tail.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Relaxed);
            if head == tail {
                break;
            }
            // Advance first so a panicking destructor cannot lead to a second drop.
            self.head.store(Self::next_index(head), Ordering::Relaxed);
            // SAFETY: `head` was in `[head, tail)`, so the slot is live; access is exclusive.
            unsafe { self.slots[head].drop_in_place() };
        }
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
    }

    // Producer cursor protocol.

    /// Slot index to fill next, or `None` when full. Producer thread only.
    #[inline]
    fn reserve_tail(&self) -> Option<usize> {
        let tail = self.tail.load(Ordering::Relaxed);
        if Self::next_index(tail) == self.head.load(Ordering::Acquire) {
            None
        } else {
            Some(tail)
        }
    }

    /// # Safety
    /// Producer thread only; `tail` is the value just returned by `reserve_tail`.
    #[inline]
    unsafe fn publish_tail(&self, tail: usize, value: T) {
        unsafe { self.slots[tail].write(value) };
        self.tail.store(Self::next_index(tail), Ordering::Release);
    }

    // Consumer cursor protocol.

    /// Slot index to consume next, or `None` when empty. Consumer thread only.
    #[inline]
    fn reserve_head(&self) -> Option<usize> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            None
        } else {
            Some(head)
        }
    }

    /// # Safety
    /// Consumer thread only; `head` is the value just returned by `reserve_head`.
    #[inline]
    unsafe fn release_head(&self, head: usize) -> T {
        let value = unsafe { self.slots[head].take() };
        self.head.store(Self::next_index(head), Ordering::Release);
        value
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<T>() {
            // SAFETY: `&mut self` gives exclusive access.
            unsafe { self.clear_unsafe() };
        }
    }
}

impl<T, const N: usize> fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.size_approx())
            .finish()
    }
}

/// Push side of a [`RingBuffer`]. Only one may be alive per ring.
pub struct Producer<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

impl<'a, T, const N: usize> Producer<'a, T, N> {
    /// Move `value` into the ring. On `Full` the value is handed back.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), PushError<T>> {
        let Some(tail) = self.ring.reserve_tail() else {
            return Err(PushError::Full(value));
        };
        // SAFETY: `&mut self` on the only producer; `tail` is freshly reserved.
        unsafe { self.ring.publish_tail(tail, value) };
        Ok(())
    }

    /// Push a clone of `value`. Nothing is cloned when the ring is full.
    #[inline]
    pub fn try_push_cloned(&mut self, value: &T) -> Result<(), PushError<()>>
    where
        T: Clone,
    {
        let Some(tail) = self.ring.reserve_tail() else {
            return Err(PushError::Full(()));
        };
        let value = value.clone();
        // SAFETY: as in `try_push`.
        unsafe { self.ring.publish_tail(tail, value) };
        Ok(())
    }

    /// Build the element with `make` only once a free slot is confirmed.
    /// On `Full` the constructor is returned without having been called.
    #[inline]
    pub fn try_emplace<F>(&mut self, make: F) -> Result<(), PushError<F>>
    where
        F: FnOnce() -> T,
    {
        let Some(tail) = self.ring.reserve_tail() else {
            return Err(PushError::Full(make));
        };
        // A panic in `make` leaves the ring untouched.
        let value = make();
        // SAFETY: as in `try_push`.
        unsafe { self.ring.publish_tail(tail, value) };
        Ok(())
    }

    /// Whether the next push would be rejected, as seen right now.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.reserve_tail().is_none()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    pub fn size_approx(&self) -> usize {
        self.ring.size_approx()
    }
}

impl<'a, T, const N: usize> Drop for Producer<'a, T, N> {
    fn drop(&mut self) {
        self.ring.producer_active.store(false, Ordering::Release);
    }
}

impl<'a, T, const N: usize> fmt::Debug for Producer<'a, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("ring", self.ring).finish()
    }
}

/// Pop side of a [`RingBuffer`]. Only one may be alive per ring.
///
/// `&Consumer` hands out `&T` through [`Consumer::front`], so it is only `Sync` when `T` is:
///
/// ```compile_fail
/// use std::cell::Cell;
/// use ph_ring::RingBuffer;
///
/// let ring = RingBuffer::<Cell<u32>, 4>::new();
/// let consumer = ring.consumer();
/// let shared = &consumer;
/// std::thread::scope(|s| {
///     s.spawn(|| shared.front().map(|c| c.set(c.get() + 1)));
///     s.spawn(|| shared.front().map(|c| c.set(c.get() + 1)));
/// });
/// ```
pub struct Consumer<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
    _not_sync: PhantomData<Cell<()>>,
}

// SAFETY: through `&Consumer` only `front` (shared `&T`) and snapshot queries are reachable,
// and sharing `&T` across threads is sound when `T: Sync`.
unsafe impl<T: Send + Sync, const N: usize> Sync for Consumer<'_, T, N> {}

impl<'a, T, const N: usize> Consumer<'a, T, N> {
    /// Take the oldest element, or `None` if the ring is empty.
    #[must_use]
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let head = self.ring.reserve_head()?;
        // SAFETY: `&mut self` on the only consumer; `head` is freshly reserved.
        Some(unsafe { self.ring.release_head(head) })
    }

    /// Borrow the oldest element without removing it.
    #[must_use]
    #[inline]
    pub fn front(&self) -> Option<&T> {
        let head = self.ring.reserve_head()?;
        // SAFETY: only this consumer advances `head`, and it needs `&mut self` to do so, which
        // the returned borrow prevents.
        Some(unsafe { self.ring.slots[head].get() })
    }

    /// Whether the ring has nothing to pop, as seen right now.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.reserve_head().is_none()
    }

    /// Pop up to `max` elements in order, handing each to `hook`.
    /// Returns how many were delivered.
    pub fn drain_up_to(&mut self, max: usize, mut hook: impl FnMut(T)) -> usize {
        let mut read = 0usize;
        while read < max {
            match self.try_pop() {
                Some(value) => {
                    hook(value);
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Iterator that pops until the ring is observed empty.
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, 'a, T, N> {
        Drain { consumer: self }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    pub fn size_approx(&self) -> usize {
        self.ring.size_approx()
    }
}

impl<'a, T, const N: usize> Drop for Consumer<'a, T, N> {
    fn drop(&mut self) {
        self.ring.consumer_active.store(false, Ordering::Release);
    }
}

impl<'a, T, const N: usize> fmt::Debug for Consumer<'a, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("ring", self.ring).finish()
    }
}

/// Returned by [`Consumer::drain`].
pub struct Drain<'c, 'a, T, const N: usize> {
    consumer: &'c mut Consumer<'a, T, N>,
}

impl<'c, 'a, T, const N: usize> Iterator for Drain<'c, 'a, T, N> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.consumer.try_pop()
    }
}
