//! Throughput and crack statistics, and the status line that shows them.
//!
//! Workers never touch these directly: each finished block is reported as a
//! [`Pulse`] and applied by the single coordinating thread.

use std::fmt::Write as _;

use indicatif::{ProgressBar, ProgressStyle};

/// Telemetry for one finished block.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub worker: usize,
    /// Wall time spent hashing and looking up the block.
    pub elapsed_ms: u64,
    /// Candidates in the block.
    pub attempted: u64,
    pub last_attempted: Vec<u8>,
}

pub struct ProgressTracker {
    block_size: usize,
    /// Last block duration per worker, in milliseconds.
    slots: Vec<u64>,
    pulses: u64,
    total: usize,
    processed: u64,
    cracked: u64,
    last_cracked: Vec<u8>,
    last_attempted: Vec<u8>,
    width: usize,
}

impl ProgressTracker {
    /// `total` is the number of digests in the hash list; `width` the status
    /// line's column count.
    pub fn new(block_size: usize, threads: usize, total: usize, width: usize) -> Self {
        Self {
            block_size,
            slots: vec![0; threads.max(1)],
            pulses: 0,
            total,
            processed: 0,
            cracked: 0,
            last_cracked: Vec::new(),
            last_attempted: Vec::new(),
            width,
        }
    }

    pub fn pulse(&mut self, pulse: Pulse) {
        if let Some(slot) = self.slots.get_mut(pulse.worker) {
            *slot = pulse.elapsed_ms;
        }
        self.pulses += 1;
        self.processed += pulse.attempted;
        if !pulse.last_attempted.is_empty() {
            self.last_attempted = pulse.last_attempted;
        }
    }

    pub fn record_crack(&mut self, candidate: &[u8]) {
        self.cracked += 1;
        self.last_cracked.clear();
        self.last_cracked.extend_from_slice(candidate);
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn cracked(&self) -> u64 {
        self.cracked
    }

    /// Estimated candidates per second, assuming every worker finishes a
    /// block in its last reported time. Zero before the first pulse.
    pub fn rate(&self) -> u64 {
        if self.pulses == 0 {
            return 0;
        }
        let total_ms: u64 = self.slots.iter().sum();
        (self.block_size as u64 * 1000 * self.slots.len() as u64) / total_ms.max(1)
    }

    /// Renders the status line, padded or cut to exactly `width` columns.
    pub fn render(&self) -> String {
        let percent = if self.total == 0 {
            0.0
        } else {
            self.cracked as f64 * 100.0 / self.total as f64
        };

        let mut line = String::with_capacity(self.width);
        let _ = write!(
            line,
            "{}/s | {}/{} ({:.2}%) | {} tried | last: {} | trying: ",
            format_rate(self.rate()),
            self.cracked,
            self.total,
            percent,
            self.processed,
            printable(&self.last_cracked),
        );
        line.push_str(&printable(&self.last_attempted));
        fit(line, self.width)
    }
}

/// Scales `rate` to a short figure with a K/M/B suffix.
pub fn format_rate(rate: u64) -> String {
    let r = rate as f64;
    match rate {
        1_000_000_000.. => format!("{:.2}B", r / 1e9),
        1_000_000.. => format!("{:.2}M", r / 1e6),
        1_000.. => format!("{:.2}K", r / 1e3),
        _ => rate.to_string(),
    }
}

/// Bytes outside printable ASCII become spaces, so the line cannot break the
/// terminal.
fn printable(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { ' ' }).collect()
}

fn fit(mut line: String, width: usize) -> String {
    // Only ASCII reaches here, so byte length is column count.
    line.truncate(width);
    while line.len() < width {
        line.push(' ');
    }
    line
}

/// The live status line on stderr.
pub struct StatusLine {
    bar: ProgressBar,
}

impl StatusLine {
    /// Draws on stderr; indicatif hides the bar when stderr is not a
    /// terminal.
    pub fn stderr() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .expect("Invalid status line template"),
        );
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    pub fn update(&self, line: String) {
        self.bar.set_message(line);
    }

    /// Leaves the last status on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(worker: usize, elapsed_ms: u64, last: &[u8]) -> Pulse {
        Pulse { worker, elapsed_ms, attempted: 4096, last_attempted: last.to_vec() }
    }

    #[test]
    fn test_rate_formula() {
        let mut tracker = ProgressTracker::new(4096, 4, 1000, 100);
        assert_eq!(tracker.rate(), 0);

        for worker in 0..4 {
            tracker.pulse(pulse(worker, 10, b"w"));
        }
        // 4096 * 1000 * 4 / 40
        assert_eq!(tracker.rate(), 409_600);
        assert_eq!(tracker.processed(), 4 * 4096);

        // A slot holds only the latest duration.
        tracker.pulse(pulse(0, 50, b"w"));
        assert_eq!(tracker.rate(), 4096 * 1000 * 4 / 80);
    }

    #[test]
    fn test_rate_with_instant_blocks() {
        let mut tracker = ProgressTracker::new(100, 2, 10, 80);
        tracker.pulse(pulse(0, 0, b""));
        assert_eq!(tracker.rate(), 200_000);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(999), "999");
        assert_eq!(format_rate(1_500), "1.50K");
        assert_eq!(format_rate(2_250_000), "2.25M");
        assert_eq!(format_rate(3_000_000_000), "3.00B");
    }

    #[test]
    fn test_render() {
        let mut tracker = ProgressTracker::new(4096, 1, 8, 100);
        tracker.pulse(pulse(0, 1000, b"dragon\x01"));
        tracker.record_crack(b"pass\tword");
        tracker.record_crack(b"letmein");

        let line = tracker.render();
        assert_eq!(line.len(), 100);
        assert!(line.starts_with("4.10K/s | 2/8 (25.00%) | 4096 tried"), "{line}");
        assert!(line.contains("last: letmein | trying: dragon "), "{line}");
        assert!(!line.contains('\x01'));
    }

    #[test]
    fn test_render_truncates_and_blanks_control_bytes() {
        let mut tracker = ProgressTracker::new(1, 1, 0, 30);
        tracker.record_crack(&[b'a', 0x1B, b'b']);
        let line = tracker.render();
        assert_eq!(line.len(), 30);
        assert!(line.starts_with("0/s | 1/0 (0.00%)"), "{line}");

        assert_eq!(printable(&[b'a', 0x1B, b'b', 0xC3]), "a b ");
    }

    #[test]
    fn test_pulse_from_unknown_worker_is_counted() {
        let mut tracker = ProgressTracker::new(10, 1, 0, 40);
        tracker.pulse(pulse(7, 5, b"x"));
        assert_eq!(tracker.processed(), 4096);
        assert_eq!(tracker.cracked(), 0);
    }

    #[test]
    fn test_hidden_status_line() {
        let status = StatusLine::hidden();
        status.update("quiet".to_string());
        status.finish();
    }
}
