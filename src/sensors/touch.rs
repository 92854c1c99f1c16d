//! Touch identification
//!
//! A probe is "touched" when its reading moves further than the threshold
//! away from its baseline, in either direction (a warm hand or an ice cube
//! both work). The identifier is polled by the caller with the elapsed time
//! and a fresh sample; it never sleeps or reads the bus itself.

use crate::config::slots::MAX_BUS_DEVICES;
use heapless::Vec;

/// Result of one identification poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchPoll {
    /// Nothing over threshold yet, window still open
    Pending,
    /// Candidate `index` moved from `baseline` to `reading`
    Touched {
        index: usize,
        baseline: f32,
        reading: f32,
    },
    /// The window elapsed without a touch
    TimedOut,
}

fn exceeds(baseline: f32, reading: f32, threshold: f32) -> bool {
    let delta = reading - baseline;
    delta > threshold || delta < -threshold
}

/// Index of the first candidate at or after `start` whose reading deviates
/// from its baseline by more than `threshold`.
///
/// Candidates without a baseline or without a reading never match.
pub fn first_touched(
    baselines: &[Option<f32>],
    sample: &[Option<f32>],
    threshold: f32,
    start: usize,
) -> Option<usize> {
    baselines
        .iter()
        .zip(sample.iter())
        .enumerate()
        .skip(start)
        .find_map(|(index, pair)| match pair {
            (Some(baseline), Some(reading)) if exceeds(*baseline, *reading, threshold) => {
                Some(index)
            }
            _ => None,
        })
}

/// Windowed touch detector over a fixed candidate list
#[derive(Debug, Clone)]
pub struct TouchIdentifier {
    baselines: Vec<Option<f32>, MAX_BUS_DEVICES>,
    threshold: f32,
    budget_ms: u32,
    elapsed_ms: u32,
}

impl TouchIdentifier {
    /// Create an identifier; it reports `TimedOut` until [`arm`](Self::arm)ed.
    pub fn new(baselines: &[Option<f32>], threshold: f32) -> Self {
        let mut stored = Vec::new();
        for baseline in baselines.iter().take(MAX_BUS_DEVICES) {
            let _ = stored.push(*baseline);
        }
        Self {
            baselines: stored,
            threshold,
            budget_ms: 0,
            elapsed_ms: 0,
        }
    }

    /// Open a new window of `budget_ms`
    pub fn arm(&mut self, budget_ms: u32) {
        self.budget_ms = budget_ms;
        self.elapsed_ms = 0;
    }

    /// Advance the window by `elapsed_ms` and examine `sample`.
    ///
    /// The touched candidate's baseline is replaced by its new reading.
    pub fn poll(&mut self, elapsed_ms: u32, sample: &[Option<f32>]) -> TouchPoll {
        if self.advance(elapsed_ms) {
            return TouchPoll::TimedOut;
        }
        self.scan(sample, 0)
    }

    /// Advance the window clock; true once the window has elapsed
    pub fn advance(&mut self, elapsed_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
        self.elapsed_ms >= self.budget_ms
    }

    /// Examine `sample` from candidate `start` on without touching the clock.
    ///
    /// Lets a caller that rejects a hit keep scanning the rest of the same
    /// pass. Never returns `TimedOut`.
    pub fn scan(&mut self, sample: &[Option<f32>], start: usize) -> TouchPoll {
        let touched = first_touched(&self.baselines, sample, self.threshold, start);

        // Candidates that had no baseline at capture time adopt their first reading
        for (baseline, reading) in self.baselines.iter_mut().zip(sample.iter()) {
            if baseline.is_none() {
                *baseline = *reading;
            }
        }

        match touched {
            Some(index) => {
                // Both present, checked by first_touched
                let baseline = self.baselines[index].unwrap_or_default();
                let reading = sample[index].unwrap_or_default();
                self.baselines[index] = Some(reading);
                TouchPoll::Touched {
                    index,
                    baseline,
                    reading,
                }
            }
            None => TouchPoll::Pending,
        }
    }

    /// Replace one candidate's baseline
    pub fn refresh_baseline(&mut self, index: usize, value: f32) {
        if let Some(baseline) = self.baselines.get_mut(index) {
            *baseline = Some(value);
        }
    }

    pub fn baselines(&self) -> &[Option<f32>] {
        &self.baselines
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Time spent in the current window
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn remaining_ms(&self) -> u32 {
        self.budget_ms.saturating_sub(self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::timing::TOUCH_THRESHOLD_C;

    const BASE: [Option<f32>; 3] = [Some(20.0), Some(20.0), Some(20.0)];

    #[test]
    fn test_touch_on_index_one() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        touch.arm(30_000);

        let result = touch.poll(500, &[Some(20.0), Some(22.0), Some(20.0)]);
        assert_eq!(
            result,
            TouchPoll::Touched {
                index: 1,
                baseline: 20.0,
                reading: 22.0
            }
        );
        // Baseline follows the touched probe
        assert_eq!(touch.baselines()[1], Some(22.0));
    }

    #[test]
    fn test_first_in_enumeration_order_wins() {
        let sample = [Some(20.0), Some(25.0), Some(30.0)];
        assert_eq!(first_touched(&BASE, &sample, TOUCH_THRESHOLD_C, 0), Some(1));
        assert_eq!(first_touched(&BASE, &sample, TOUCH_THRESHOLD_C, 2), Some(2));
    }

    #[test]
    fn test_cooling_counts_as_touch() {
        let sample = [Some(20.0), Some(20.0), Some(18.0)];
        assert_eq!(first_touched(&BASE, &sample, TOUCH_THRESHOLD_C, 0), Some(2));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let sample = [Some(21.5), Some(18.5), Some(20.0)];
        assert_eq!(first_touched(&BASE, &sample, TOUCH_THRESHOLD_C, 0), None);
    }

    #[test]
    fn test_failed_read_never_touches() {
        let sample = [None, Some(20.1), Some(20.0)];
        assert_eq!(first_touched(&BASE, &sample, TOUCH_THRESHOLD_C, 0), None);
    }

    #[test]
    fn test_missing_baseline_adopts_first_reading() {
        let mut touch = TouchIdentifier::new(&[None, Some(20.0)], TOUCH_THRESHOLD_C);
        touch.arm(30_000);

        assert_eq!(touch.poll(500, &[Some(35.0), Some(20.0)]), TouchPoll::Pending);
        assert_eq!(touch.baselines()[0], Some(35.0));

        let result = touch.poll(500, &[Some(40.0), Some(20.0)]);
        assert!(matches!(result, TouchPoll::Touched { index: 0, .. }));
    }

    #[test]
    fn test_times_out_after_budget() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        touch.arm(1_000);
        let quiet = [Some(20.0), Some(20.0), Some(20.0)];

        assert_eq!(touch.poll(500, &quiet), TouchPoll::Pending);
        assert_eq!(touch.remaining_ms(), 500);
        assert_eq!(touch.poll(500, &quiet), TouchPoll::TimedOut);
    }

    #[test]
    fn test_sample_at_deadline_is_ignored() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        touch.arm(1_000);

        let hot = [Some(25.0), Some(20.0), Some(20.0)];
        assert_eq!(touch.poll(1_000, &hot), TouchPoll::TimedOut);
    }

    #[test]
    fn test_rearm_resets_window() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        touch.arm(1_000);
        let quiet = [Some(20.0); 3];

        touch.poll(900, &quiet);
        touch.arm(1_000);
        assert_eq!(touch.elapsed_ms(), 0);
        assert_eq!(touch.poll(900, &quiet), TouchPoll::Pending);
    }

    #[test]
    fn test_scan_continues_past_rejected_hit() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        touch.arm(30_000);
        assert!(!touch.advance(500));

        let sample = [Some(25.0), Some(20.0), Some(24.0)];
        assert!(matches!(touch.scan(&sample, 0), TouchPoll::Touched { index: 0, .. }));
        assert!(matches!(touch.scan(&sample, 1), TouchPoll::Touched { index: 2, .. }));
        assert_eq!(touch.scan(&sample, 3), TouchPoll::Pending);
        assert_eq!(touch.elapsed_ms(), 500);
    }

    #[test]
    fn test_unarmed_reports_timeout() {
        let mut touch = TouchIdentifier::new(&BASE, TOUCH_THRESHOLD_C);
        assert_eq!(touch.poll(0, &[Some(30.0); 3]), TouchPoll::TimedOut);
    }
}
