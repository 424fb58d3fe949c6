//! Auto-run: periodic event injection on simulated time.
//!
//! The driver holds a queue of machine events and injects one every
//! `period` time units while running. Between injections the machine's own
//! clock is advanced, so signals rise and fall exactly as they would if a
//! person were clicking through the steps. Stopping drops the queue; nothing
//! queued before a stop is ever injected afterwards.

use std::collections::VecDeque;

use tracing::{event, Level};

use crate::config::SimConfig;
use crate::machine::{Machine, MachineEvent};

#[derive(Debug, Clone)]
pub struct AutoRun {
    period: u64,
    until_next: u64,
    queue: VecDeque<MachineEvent>,
    running: bool,
    injected: u64,
}

impl AutoRun {
    /// Create a stopped driver. A zero period is treated as one.
    pub fn new(period: u64) -> Self {
        let period = period.max(1);
        Self {
            period,
            until_next: period,
            queue: VecDeque::new(),
            running: false,
            injected: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.autorun_period)
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total events injected since creation.
    pub fn injected(&self) -> u64 {
        self.injected
    }

    pub fn enqueue<I: IntoIterator<Item = MachineEvent>>(&mut self, events: I) {
        self.queue.extend(events);
    }

    /// Start injecting. The first event falls due one full period from now.
    ///
    /// Returns false (and stays stopped) if there is nothing to inject.
    pub fn start(&mut self) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        self.running = true;
        self.until_next = self.period;
        event!(Level::DEBUG, pending = self.queue.len(), "auto-run started");
        true
    }

    /// Cancel. Pending events are discarded; returns how many.
    pub fn stop(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        if self.running {
            event!(Level::DEBUG, dropped, "auto-run stopped");
        }
        self.running = false;
        self.until_next = self.period;
        dropped
    }

    /// Let `elapsed` time units pass, injecting every event that falls due.
    ///
    /// The machine's clock is always advanced by exactly `elapsed`. Returns
    /// the number of events injected during this call.
    pub fn advance(&mut self, machine: &mut Machine, elapsed: u64) -> usize {
        let mut left = elapsed;
        let mut injected = 0;

        while self.running && left >= self.until_next {
            machine.advance(self.until_next);
            left -= self.until_next;
            self.until_next = self.period;

            if let Some(next) = self.queue.pop_front() {
                machine.dispatch(next);
                injected += 1;
                self.injected += 1;
            }
            if self.queue.is_empty() {
                event!(Level::DEBUG, "auto-run finished");
                self.running = false;
            }
        }

        if self.running {
            self.until_next -= left;
        }
        machine.advance(left);
        injected
    }

    /// Run until the queue drains, returning the time consumed.
    pub fn run_to_completion(&mut self, machine: &mut Machine) -> u64 {
        let start = machine.now();
        while self.running {
            let step = self.until_next;
            self.advance(machine, step);
        }
        machine.now() - start
    }
}

impl Default for AutoRun {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::register::RegisterEvent;

    fn increments(n: usize) -> Vec<MachineEvent> {
        vec![MachineEvent::Ac(RegisterEvent::Increment); n]
    }

    #[test]
    fn test_injects_once_per_period() {
        let mut m = Machine::new();
        let mut run = AutoRun::new(100);
        run.enqueue(increments(3));
        assert!(run.start());

        assert_eq!(run.advance(&mut m, 99), 0);
        assert_eq!(m.ac.value(), 0);
        assert_eq!(run.advance(&mut m, 1), 1);
        assert_eq!(m.ac.value(), 1);
        assert_eq!(run.advance(&mut m, 250), 2);
        assert_eq!(m.ac.value(), 3);
        assert!(!run.is_running());
        assert_eq!(m.now(), 350);
    }

    #[test]
    fn test_stop_prevents_later_injection() {
        let mut m = Machine::new();
        let mut run = AutoRun::new(100);
        run.enqueue(increments(5));
        run.start();
        run.advance(&mut m, 150);
        assert_eq!(m.ac.value(), 1);

        assert_eq!(run.stop(), 4);
        assert_eq!(run.advance(&mut m, 10_000), 0);
        assert_eq!(m.ac.value(), 1);
        assert_eq!(run.pending(), 0);
        // Nothing left to restart with.
        assert!(!run.start());
    }

    #[test]
    fn test_signals_expire_between_injections() {
        let mut m = Machine::new();
        let mut run = AutoRun::new(500);
        run.enqueue(increments(2));
        run.start();
        run.advance(&mut m, 500);
        assert!(m.is_signaling());
        run.advance(&mut m, 200);
        assert!(!m.is_signaling());
    }

    #[test]
    fn test_run_to_completion() {
        let mut m = Machine::new();
        let mut run = AutoRun::new(10);
        run.enqueue(increments(4));
        run.start();
        assert_eq!(run.run_to_completion(&mut m), 40);
        assert_eq!(m.ac.value(), 4);
        assert_eq!(run.injected(), 4);
    }

    #[test]
    fn test_zero_period_clamped() {
        assert_eq!(AutoRun::new(0).period(), 1);
    }
}
