//! File/code adapted from https://github.com/jamjamjon/usls

use std::time::Duration;

/// Accumulated durations of the head's forward stages.
#[derive(Debug, Default)]
pub struct TimeCalc {
    n: usize,
    duration: Vec<Duration>,
}

#[allow(dead_code)]
impl TimeCalc {
    pub fn total(&self) -> Duration {
        self.duration.iter().sum::<Duration>()
    }

    /// Number of complete passes recorded.
    pub fn n(&self) -> usize {
        match self.duration.len() {
            0 => 0,
            stages => self.n / stages,
        }
    }

    pub fn avg(&self) -> Option<Duration> {
        match self.n() {
            0 => None,
            n => Some(self.total() / n as u32),
        }
    }

    pub fn avg_i(&self, i: usize) -> Option<Duration> {
        let n = self.n();
        if n == 0 {
            return None;
        }
        self.duration.get(i).map(|d| *d / n as u32)
    }

    pub fn ts(&self) -> &Vec<Duration> {
        &self.duration
    }

    pub fn add_or_push(&mut self, i: usize, x: Duration) {
        match self.duration.get_mut(i) {
            Some(elem) => *elem += x,
            None => self.duration.push(x),
        }
        self.n += 1;
    }

    pub fn clear(&mut self) {
        self.n = Default::default();
        self.duration = Default::default();
    }
}
