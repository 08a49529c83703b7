use std::hint::black_box;
use std::time::{Duration, Instant};

use cqueue::ffi::*;

pub fn bench(iters: usize) -> Duration {
    let q = cqueue_new();
    let elapsed;
    unsafe {
        cqueue_reset(q);
        let queue = &*q;
        elapsed = std::thread::scope(|cx| {
            cx.spawn(|| {
                for i in 0..iters {
                    while !cqueue_enqueue(queue, i as i32) {
                        std::hint::spin_loop();
                    }
                }
            });

            let now = Instant::now();
            let mut val = 0;
            for i in 0..iters {
                while !cqueue_dequeue(queue, &mut val) {
                    std::hint::spin_loop();
                }
                assert_eq!(black_box(val), i as i32);
            }
            now.elapsed()
        });
        cqueue_free(q);
    }
    elapsed
}
