//! Slow consumer: what the loss accounting looks like under overload.
//!
//! The feeder sends bursts faster than the main thread drains a deliberately
//! small queue (32 usable bytes). The reception thread never blocks; whatever
//! the queue cannot take is counted as dropped and each lossy notification
//! adds one overflow event. Every burst the main thread prints the counters
//! accumulated since the last report.
//!
//! ```text
//!   feeder ──bursts──► reception thread ──► ByteQueue<33> ──► main (drains 8 B / tick)
//! ```

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serial_idle_rx::constants::DEFAULT_DMA_BUFFER_SIZE;
use serial_idle_rx::hosted::{self, Event};
use serial_idle_rx::queue::ByteQueue;
use serial_idle_rx::sim::SimulatedUart;
use serial_idle_rx::{Extraction, LineError, ReceptionContext};

const DMA_BUF_LEN: usize = DEFAULT_DMA_BUFFER_SIZE;
const QUEUE_LEN: usize = 33;
const BURSTS: usize = 12;

/// Counters accumulated between two reports.
#[derive(Default, Clone, Copy)]
struct Window {
    received: usize,
    dropped: usize,
    overflows: usize,
    line_errors: usize,
}

impl Window {
    fn record(&mut self, outcome: &Extraction) {
        self.received += outcome.received;
        self.dropped += outcome.dropped();
        self.overflows += usize::from(outcome.dropped() > 0);
        self.line_errors += usize::from(outcome.line_error.is_some());
    }
}

fn main() -> std::io::Result<()> {
    let queue: &'static mut ByteQueue<QUEUE_LEN> = Box::leak(Box::new(ByteQueue::new()));
    let (producer, mut consumer) = queue.split();

    let window = Arc::new(Mutex::new(Window::default()));
    let recorder = Arc::clone(&window);
    let ctx = Box::pin(ReceptionContext::<SimulatedUart, _, DMA_BUF_LEN>::new(SimulatedUart::new()));
    let (events, reception) = hosted::spawn(ctx, Some(producer), move |outcome| {
        if let Ok(mut w) = recorder.lock() {
            w.record(outcome);
        }
    })?;

    let mut drained = 0usize;
    let mut chunk = [0u8; 8];
    for burst in 0..BURSTS {
        let payload: Vec<u8> = (0..24 + burst * 3).map(|i| b'a' + (i % 26) as u8).collect();
        if burst == BURSTS / 2 {
            let _ = events.send(Event::LineError(LineError::Overrun));
        }
        if events.send(Event::Receive(payload)).is_err() {
            break;
        }

        thread::sleep(Duration::from_millis(5));
        drained += consumer.pop_slice(&mut chunk);

        let w = match window.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(_) => break,
        };
        println!(
            "burst {burst:2}: +{:3} received, +{:3} dropped, +{} overflow, +{} line errors",
            w.received, w.dropped, w.overflows, w.line_errors
        );
    }

    let _ = events.send(Event::Shutdown);
    let ctx = match reception.join() {
        Ok(ctx) => ctx,
        Err(_) => {
            eprintln!("reception thread panicked");
            std::process::exit(1);
        }
    };

    let stats = ctx.statistics();
    println!(
        "total: {} received, {} dropped ({:.0}% loss), {} overflow events, {} drained by main",
        stats.received,
        stats.dropped,
        stats.loss_ratio() * 100.0,
        stats.overflow_count,
        drained
    );
    Ok(())
}
