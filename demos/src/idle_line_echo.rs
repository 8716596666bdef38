//! Idle-line echo: variable-length frames in, complete frames out.
//!
//! A feeder thread plays the remote peer and sends NMEA-style sentences of
//! varying length. The reception thread runs the idle-line extraction over a
//! 64-byte simulated DMA buffer and pushes into a 256-byte queue. The main
//! thread is woken after every extraction, drains the queue through
//! `embedded_io::Read`, and echoes each complete line.
//!
//! Pipeline:
//! ```text
//!   feeder ──Event::Receive──► reception thread ──► ByteQueue<256> ──► main (echo)
//!                              SimulatedUart<64>
//! ```

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use embedded_io::{Read, ReadReady};
use serial_idle_rx::constants::{DEFAULT_DMA_BUFFER_SIZE, DEFAULT_QUEUE_SIZE};
use serial_idle_rx::hosted::{self, Event};
use serial_idle_rx::queue::ByteQueue;
use serial_idle_rx::sim::SimulatedUart;
use serial_idle_rx::ReceptionContext;

const DMA_BUF_LEN: usize = DEFAULT_DMA_BUFFER_SIZE;
const QUEUE_LEN: usize = DEFAULT_QUEUE_SIZE;

const SENTENCES: [&str; 5] = [
    "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n",
    "$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39\r\n",
    "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n",
    "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48\r\n",
    "$GPZDA,201530.00,04,07,2002,00,00*60\r\n",
];

fn main() -> std::io::Result<()> {
    // The queue outlives both threads.
    let queue: &'static mut ByteQueue<QUEUE_LEN> = Box::leak(Box::new(ByteQueue::new()));
    let (producer, mut consumer) = queue.split();

    let (wake_tx, wake_rx) = mpsc::channel();
    let ctx = Box::pin(ReceptionContext::<SimulatedUart, _, DMA_BUF_LEN>::new(SimulatedUart::new()));
    let (events, reception) = hosted::spawn(ctx, Some(producer), move |outcome| {
        let _ = wake_tx.send(*outcome);
    })?;

    let feeder = thread::spawn(move || {
        for round in 0..4 {
            for sentence in SENTENCES {
                if events.send(Event::Receive(sentence.as_bytes().to_vec())).is_err() {
                    return;
                }
                thread::sleep(Duration::from_millis(2 + round));
            }
        }
        let _ = events.send(Event::Shutdown);
    });

    let mut line = Vec::new();
    let mut chunk = [0u8; 128];
    let mut lines = 0usize;
    // Ends once the reception thread has stopped and dropped the waker.
    while wake_rx.recv().is_ok() {
        while consumer.read_ready().unwrap_or(false) {
            let n = match consumer.read(&mut chunk) {
                Ok(n) => n,
                Err(never) => match never {},
            };
            for &byte in &chunk[..n] {
                line.push(byte);
                if byte == b'\n' {
                    print!("rx: {}", String::from_utf8_lossy(&line));
                    line.clear();
                    lines += 1;
                }
            }
        }
    }

    let _ = feeder.join();
    let ctx = match reception.join() {
        Ok(ctx) => ctx,
        Err(_) => {
            eprintln!("reception thread panicked");
            std::process::exit(1);
        }
    };

    let stats = ctx.statistics();
    println!(
        "{lines} lines, {} bytes received, {} dropped, {} overflow events",
        stats.received, stats.dropped, stats.overflow_count
    );
    Ok(())
}
