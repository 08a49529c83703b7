use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ring size used by the C boundary.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A bounded single-producer/single-consumer ring of `N` inline slots.
///
/// One slot is always left empty so that `head == tail` means empty and
/// `tail + 1 == head` (modulo `N`) means full, which gives a usable capacity
/// of `N - 1`. `N` must be a power of two no smaller than 2; other values are
/// rejected when the queue is instantiated.
///
/// Only the producer writes `tail` and only the consumer writes `head`. Use
/// [`split`](Self::split) to obtain the two roles; the raw `*_unchecked`
/// operations exist for callers that cannot express the split in types.
pub struct BoundedQueue<T, const N: usize = DEFAULT_CAPACITY> {
    buf: [UnsafeCell<MaybeUninit<T>>; N],
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: Slots are handed between exactly one producer and one consumer,
// and each hand-off is published through a `Release` store on an index that
// the other side loads with `Acquire`.
unsafe impl<T: Send, const N: usize> Sync for BoundedQueue<T, N> {}

impl<T: Copy, const N: usize> BoundedQueue<T, N> {
    const MASK: usize = {
        assert!(N.is_power_of_two() && N >= 2, "queue size must be a power of two");
        N - 1
    };

    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            buf: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of values the queue can hold at once.
    pub const fn capacity(&self) -> usize {
        Self::MASK
    }

    /// Snapshot of the number of queued values. It may be stale by the time
    /// it is observed if the other role is running.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) & Self::MASK
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_add(1) & Self::MASK == head
    }

    /// Empties the queue.
    pub fn reset(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
    }

    /// Splits the queue into its producer and consumer roles.
    ///
    /// Both handles borrow the queue, so it cannot be reset or split again
    /// while either of them is alive.
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let queue = &*self;
        (Producer { queue }, Consumer { queue })
    }

    /// Empties the queue through a shared reference.
    ///
    /// # Safety
    ///
    /// No enqueue or dequeue may run concurrently with this call, and the
    /// threads that use the queue afterwards must be synchronized with it
    /// (e.g. spawned after it returns).
    pub unsafe fn reset_unchecked(&self) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
    }

    /// Appends `val`, handing it back if the queue is full.
    ///
    /// # Safety
    ///
    /// At most one thread may enqueue at any time. Concurrent producers race
    /// on the same slot and on `tail`, which is undefined behavior.
    pub unsafe fn enqueue_unchecked(&self, val: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let next_tail = tail.wrapping_add(1) & Self::MASK;
        // `Acquire` orders the consumer's last read of this slot before our write.
        if next_tail == self.head.load(Ordering::Acquire) {
            return Err(val);
        }

        unsafe { (*self.buf[tail].get()).write(val) };
        // `Release` publishes the slot before the new tail becomes visible.
        self.tail.store(next_tail, Ordering::Release);

        Ok(())
    }

    /// Removes the oldest value, or returns `None` if the queue is empty.
    ///
    /// # Safety
    ///
    /// At most one thread may dequeue at any time. Concurrent consumers may
    /// observe the same slot twice and race on `head`, which is undefined
    /// behavior.
    pub unsafe fn dequeue_unchecked(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        let next_head = head.wrapping_add(1) & Self::MASK;

        // SAFETY: `head != tail`, so the producer initialized this slot and
        // will not touch it until `head` moves past it.
        let val = unsafe { (*self.buf[head].get()).assume_init() };
        self.head.store(next_head, Ordering::Release);

        Some(val)
    }
}

impl<T: Copy, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for BoundedQueue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("size", &N)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// The enqueuing half of a [`BoundedQueue`].
#[derive(Debug)]
pub struct Producer<'a, T, const N: usize = DEFAULT_CAPACITY> {
    queue: &'a BoundedQueue<T, N>,
}

impl<T: Copy, const N: usize> Producer<'_, T, N> {
    pub fn enqueue(&mut self, val: T) -> Result<(), T> {
        // SAFETY: `Producer` is unique per split and `enqueue` takes `&mut self`.
        unsafe { self.queue.enqueue_unchecked(val) }
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

/// The dequeuing half of a [`BoundedQueue`].
#[derive(Debug)]
pub struct Consumer<'a, T, const N: usize = DEFAULT_CAPACITY> {
    queue: &'a BoundedQueue<T, N>,
}

impl<T: Copy, const N: usize> Consumer<'_, T, N> {
    pub fn dequeue(&mut self) -> Option<T> {
        // SAFETY: `Consumer` is unique per split and `dequeue` takes `&mut self`.
        unsafe { self.queue.dequeue_unchecked() }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn queue_scenario() {
        let mut queue = BoundedQueue::<i32, 4>::new();
        queue.reset();
        let (mut tx, mut rx) = queue.split();

        assert_eq!(tx.enqueue(10), Ok(()));
        assert_eq!(tx.enqueue(20), Ok(()));
        assert_eq!(tx.enqueue(30), Ok(()));
        assert_eq!(tx.enqueue(40), Err(40));
        assert_eq!(rx.dequeue(), Some(10));
        assert_eq!(tx.enqueue(40), Ok(()));
        assert_eq!(rx.dequeue(), Some(20));
        assert_eq!(rx.dequeue(), Some(30));
        assert_eq!(rx.dequeue(), Some(40));
        assert_eq!(rx.dequeue(), None);
    }

    #[test]
    fn queue_capacity() {
        let mut queue = BoundedQueue::<u32>::new();
        assert_eq!(queue.capacity(), DEFAULT_CAPACITY - 1);

        let (mut tx, rx) = queue.split();
        for i in 0..DEFAULT_CAPACITY as u32 - 1 {
            tx.enqueue(i).unwrap();
        }
        assert!(tx.is_full());
        assert_eq!(rx.len(), DEFAULT_CAPACITY - 1);
        assert_eq!(tx.enqueue(u32::MAX), Err(u32::MAX));
    }

    #[test]
    fn queue_reset() {
        let mut queue = BoundedQueue::<i32, 8>::new();
        {
            let (mut tx, _) = queue.split();
            for i in 0..5 {
                tx.enqueue(i).unwrap();
            }
        }
        assert_eq!(queue.len(), 5);

        queue.reset();
        assert!(queue.is_empty());
        let (mut tx, mut rx) = queue.split();
        assert_eq!(rx.dequeue(), None);
        tx.enqueue(7).unwrap();
        assert_eq!(rx.dequeue(), Some(7));
    }

    #[test]
    fn queue_wraparound() {
        let mut queue = BoundedQueue::<u64, 8>::new();
        let (mut tx, mut rx) = queue.split();

        let mut next = 0u64;
        let mut expected = 0u64;
        // 5 does not divide 8, so the indices cross the boundary at every offset.
        for _ in 0..100 {
            for _ in 0..5 {
                tx.enqueue(next).unwrap();
                next += 1;
            }
            assert_eq!(rx.len(), 5);
            for _ in 0..5 {
                assert_eq!(rx.dequeue(), Some(expected));
                expected += 1;
            }
            assert!(rx.is_empty());
        }
    }

    #[test]
    fn queue_random_ops() {
        let mut queue = BoundedQueue::<u16, 16>::new();
        let (mut tx, mut rx) = queue.split();
        let mut model = VecDeque::new();

        for _ in 0..10_000 {
            if fastrand::bool() {
                let val = fastrand::u16(..);
                match tx.enqueue(val) {
                    Ok(()) => model.push_back(val),
                    Err(v) => {
                        assert_eq!(v, val);
                        assert_eq!(model.len(), 15);
                    },
                }
            } else {
                assert_eq!(rx.dequeue(), model.pop_front());
            }
            assert_eq!(rx.len(), model.len());
        }
    }

    #[test]
    fn queue_threaded() {
        const TOTAL: u32 = 50_000;

        for _ in 0..4 {
            let mut queue = BoundedQueue::<u32, 16>::new();
            let (mut tx, mut rx) = queue.split();
            std::thread::scope(|cx| {
                cx.spawn(move || {
                    for i in 0..TOTAL {
                        while tx.enqueue(i).is_err() {
                            std::thread::yield_now();
                        }
                        if fastrand::u8(..) == 0 {
                            std::thread::yield_now();
                        }
                    }
                });
                cx.spawn(move || {
                    let mut expected = 0;
                    while expected < TOTAL {
                        match rx.dequeue() {
                            Some(i) => {
                                assert_eq!(i, expected);
                                expected += 1;
                            },
                            None => std::thread::yield_now(),
                        }
                    }
                    assert_eq!(rx.dequeue(), None);
                });
            });
        }
    }

    #[test]
    fn queue_unchecked_threaded() {
        let input = std::iter::repeat_with(|| fastrand::i32(..))
            .take(5_000)
            .collect::<Vec<_>>();

        let queue = BoundedQueue::<i32, 32>::new();
        unsafe { queue.reset_unchecked() };
        std::thread::scope(|cx| {
            cx.spawn(|| {
                for i in input.iter().copied() {
                    while unsafe { queue.enqueue_unchecked(i) }.is_err() {
                        std::thread::yield_now();
                    }
                }
            });
            cx.spawn(|| {
                let mut r = Vec::with_capacity(input.len());
                while r.len() < input.len() {
                    match unsafe { queue.dequeue_unchecked() } {
                        Some(i) => r.push(i),
                        None => std::thread::yield_now(),
                    }
                }
                assert_eq!(r, input);
            });
        });
        assert!(queue.is_empty());
    }
}
