use std::hint::black_box;
use std::time::{Duration, Instant};

use cqueue::{BoundedQueue, DEFAULT_CAPACITY};

pub fn bench(iters: usize) -> Duration {
    transfer::<DEFAULT_CAPACITY>(iters)
}

pub fn transfer<const N: usize>(iters: usize) -> Duration {
    let mut queue = Box::new(BoundedQueue::<usize, N>::new());
    let (mut tx, mut rx) = queue.split();
    std::thread::scope(|cx| {
        cx.spawn(move || {
            for i in 0..iters {
                while tx.enqueue(i).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let now = Instant::now();
        for i in 0..iters {
            let val = loop {
                if let Some(val) = rx.dequeue() {
                    break val;
                }
                std::hint::spin_loop();
            };
            assert_eq!(black_box(val), i);
        }
        now.elapsed()
    })
}
