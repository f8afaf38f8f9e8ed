//! Sensor sampling thread feeding an aggregation thread through a `RingBuffer`.
//!
//! Run with `RUST_LOG=debug cargo run --example telemetry_pipeline`.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use ph_ring::RingBuffer;

const SAMPLES: u32 = 50_000;

#[derive(Debug, Clone, Copy)]
struct Sample {
    seq: u32,
    millivolts: i32,
}

fn main() {
    env_logger::init();

    let ring = RingBuffer::<Sample, 256>::new();
    info!("ring ready: {ring:?}");

    let started = Instant::now();
    let (stalls, stats) = thread::scope(|s| {
        let mut producer = ring.producer();
        let mut consumer = ring.consumer();

        let sampler = s.spawn(move || {
            let mut stalls = 0u64;
            for seq in 0..SAMPLES {
                let sample = Sample {
                    seq,
                    millivolts: (seq % 3300) as i32 - 1650,
                };
                while producer.try_push(sample).is_err() {
                    stalls += 1;
                    thread::yield_now();
                }
            }
            debug!("sampler done, {} samples queued", SAMPLES);
            stalls
        });

        let aggregator = s.spawn(move || {
            let mut count = 0u32;
            let mut sum = 0i64;
            let mut peak = i32::MIN;
            while count < SAMPLES {
                let drained = consumer.drain_up_to(64, |sample| {
                    if sample.seq != count {
                        warn!("out of order sample: expected {count}, got {}", sample.seq);
                    }
                    count += 1;
                    sum += i64::from(sample.millivolts);
                    peak = peak.max(sample.millivolts);
                });
                if drained == 0 {
                    thread::sleep(Duration::from_micros(50));
                } else if count % 10_000 < drained as u32 {
                    debug!("aggregated {count} samples, backlog ~{}", consumer.size_approx());
                }
            }
            (count, sum, peak)
        });

        let stalls = sampler.join().expect("sampler thread panicked");
        let stats = aggregator.join().expect("aggregator thread panicked");
        (stalls, stats)
    });

    let (count, sum, peak) = stats;
    info!(
        "{count} samples in {:?}, mean {} mV, peak {peak} mV, producer stalls {stalls}",
        started.elapsed(),
        sum / i64::from(count.max(1)),
    );
}
