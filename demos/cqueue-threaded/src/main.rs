use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use argh::FromArgs;
use cqueue::{BoundedQueue, Consumer, Producer};

type Queue = BoundedQueue<u32>;

#[derive(Debug, FromArgs)]
/// Stress a single-producer/single-consumer queue across two threads
#[argh(help_triggers("--help"))]
struct Args {
    /// number of values sent per round
    #[argh(option, default = "1_000_000")]
    count: u32,
    /// number of rounds
    #[argh(option, default = "1")]
    rounds: u32,
    /// upper bound of the random pause after each operation, in microseconds
    #[argh(option, default = "0")]
    pause_us: u64,
    /// abort a round that runs longer than this, in milliseconds
    #[argh(option)]
    timeout_ms: Option<u64>,
}

/// State shared by both roles of a round.
struct Round<'a> {
    args: &'a Args,
    deadline: Option<Instant>,
    aborted: AtomicBool,
}

impl Round<'_> {
    /// Retries `op` until it yields a value, and returns the value along with
    /// the number of failed attempts. Gives up once the deadline passes or
    /// the other role has failed.
    fn poll<T>(&self, mut op: impl FnMut() -> Option<T>) -> Result<(T, usize)> {
        let mut retries = 0;
        loop {
            if let Some(t) = op() {
                return Ok((t, retries));
            }
            if self.aborted.load(Ordering::Relaxed) {
                bail!("aborted after {retries} retries");
            }
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                bail!("timed out after {retries} retries");
            }
            retries += 1;
            std::thread::yield_now();
        }
    }

    fn pause(&self) {
        let max_us = self.args.pause_us;
        if max_us > 0 {
            std::thread::sleep(Duration::from_micros(fastrand::u64(0..=max_us)));
        }
    }

    fn abort_on_error<T>(&self, res: Result<T>) -> Result<T> {
        if res.is_err() {
            self.aborted.store(true, Ordering::Relaxed);
        }
        res
    }
}

#[derive(Debug, Default)]
struct Stats {
    values: u32,
    retries: usize,
}

pub fn main() -> Result<()> {
    let args = argh::from_env::<Args>();
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .without_time()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    for round in 0..args.rounds {
        let elapsed = run_round(&args, round)?;
        let rate = args.count as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "finished round({round}), elapsed={}ms, rate={rate:.0}/s",
            elapsed.as_millis()
        );
    }
    Ok(())
}

fn run_round(args: &Args, round: u32) -> Result<Duration> {
    let mut queue = Queue::new();
    queue.reset();
    tracing::info!(
        "started round({round}), count={}, capacity={}",
        args.count,
        queue.capacity()
    );

    let ctx = Round {
        args,
        deadline: args
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms)),
        aborted: AtomicBool::new(false),
    };
    let (tx, rx) = queue.split();

    let now = Instant::now();
    let (sent, received) = std::thread::scope(|cx| -> Result<_> {
        let ctx = &ctx;
        let producer = std::thread::Builder::new()
            .name("producer".to_owned())
            .spawn_scoped(cx, move || ctx.abort_on_error(produce(tx, ctx)))?;
        let consumer = std::thread::Builder::new()
            .name("consumer".to_owned())
            .spawn_scoped(cx, move || ctx.abort_on_error(consume(rx, ctx)))?;

        let sent = producer
            .join()
            .map_err(|_| anyhow!("producer panicked"))?;
        let received = consumer
            .join()
            .map_err(|_| anyhow!("consumer panicked"))?;
        Ok((sent?, received?))
    })?;
    let elapsed = now.elapsed();

    tracing::debug!(
        "sent {} values with {} retries on full",
        sent.values,
        sent.retries
    );
    tracing::debug!(
        "received {} values with {} retries on empty",
        received.values,
        received.retries
    );
    if sent.values != received.values {
        bail!("sent {} values but received {}", sent.values, received.values);
    }
    if !queue.is_empty() {
        bail!("{} values left in the queue", queue.len());
    }
    Ok(elapsed)
}

fn produce(mut tx: Producer<'_, u32>, ctx: &Round) -> Result<Stats> {
    let mut stats = Stats::default();
    for val in 0..ctx.args.count {
        let (_, retries) = ctx
            .poll(|| tx.enqueue(val).ok())
            .map_err(|e| e.context(format!("enqueue({val})")))?;
        stats.retries += retries;
        stats.values += 1;
        ctx.pause();
    }
    Ok(stats)
}

fn consume(mut rx: Consumer<'_, u32>, ctx: &Round) -> Result<Stats> {
    let mut stats = Stats::default();
    for expected in 0..ctx.args.count {
        let (val, retries) = ctx
            .poll(|| rx.dequeue())
            .map_err(|e| e.context(format!("dequeue(), expected={expected}")))?;
        if val != expected {
            bail!("received out of order, expected={expected}, got={val}");
        }
        stats.retries += retries;
        stats.values += 1;
        ctx.pause();
    }
    Ok(stats)
}
