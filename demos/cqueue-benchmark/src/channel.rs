use std::hint::black_box;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use cqueue::DEFAULT_CAPACITY;

/// Baseline with the same bound as the default queue.
pub fn bench(iters: usize) -> Duration {
    let (tx, rx) = mpsc::sync_channel(DEFAULT_CAPACITY - 1);
    std::thread::scope(|cx| {
        cx.spawn(move || {
            for i in 0..iters {
                tx.send(i).unwrap();
            }
        });

        let now = Instant::now();
        for i in 0..iters {
            assert_eq!(black_box(rx.recv().unwrap()), i);
        }
        now.elapsed()
    })
}
