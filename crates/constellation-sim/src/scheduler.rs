//! Fixed-interval sample scheduler.
//!
//! Fed elapsed simulation time, it yields every sample instant that has come due since the
//! previous call, so a large time step never skips samples. The run ends after `target`
//! samples or when stopped.

use tracing::debug;

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    interval_s: f64,
    target: usize,
    taken: usize,
    stopped: bool,
}

impl FixedStepScheduler {
    pub fn new(interval_s: f64, target: usize) -> Self {
        Self {
            interval_s,
            target,
            taken: 0,
            stopped: false,
        }
    }

    /// Scheduler covering `duration_s` with samples at `0, interval, 2·interval, ...`
    pub fn for_duration(duration_s: f64, interval_s: f64) -> Self {
        let target = if interval_s > 0.0 && duration_s > 0.0 {
            (duration_s / interval_s).ceil() as usize
        } else {
            0
        };
        Self::new(interval_s, target)
    }

    /// Sim time of the next sample, if any remain.
    pub fn next_due(&self) -> Option<f64> {
        (!self.is_done()).then(|| self.taken as f64 * self.interval_s)
    }

    /// All sample instants at or before `sim_now`, bounded by the target.
    pub fn due(&mut self, sim_now: f64) -> Vec<f64> {
        let mut due = Vec::new();
        while let Some(t) = self.next_due() {
            if t > sim_now {
                break;
            }
            due.push(t);
            self.taken += 1;
        }
        if due.len() > 1 {
            debug!("Catching up {} samples at t={:.1}s", due.len(), sim_now);
        }
        due
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_complete(&self) -> bool {
        self.taken >= self.target
    }

    pub fn is_done(&self) -> bool {
        self.stopped || self.is_complete()
    }

    pub fn taken(&self) -> usize {
        self.taken
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_s
    }

    /// Fraction of the target taken, in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.target == 0 {
            1.0
        } else {
            self.taken as f64 / self.target as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_duration() {
        assert_eq!(FixedStepScheduler::for_duration(100.0, 20.0).target(), 5);
        assert_eq!(FixedStepScheduler::for_duration(101.0, 20.0).target(), 6);
        assert_eq!(FixedStepScheduler::for_duration(0.0, 20.0).target(), 0);
    }

    #[test]
    fn test_catch_up_never_skips() {
        let mut scheduler = FixedStepScheduler::for_duration(200.0, 20.0);

        assert_eq!(scheduler.due(0.0), vec![0.0]);
        assert!(scheduler.due(19.9).is_empty());
        // one huge step
        assert_eq!(scheduler.due(75.0), vec![20.0, 40.0, 60.0]);
        assert_eq!(scheduler.taken(), 4);

        // bounded by the target
        let rest = scheduler.due(1.0e6);
        assert_eq!(rest.len(), 6);
        assert_eq!(rest.last(), Some(&180.0));
        assert!(scheduler.is_complete());
        assert!(scheduler.due(1.0e9).is_empty());
    }

    #[test]
    fn test_stop_halts_sampling() {
        let mut scheduler = FixedStepScheduler::for_duration(200.0, 20.0);
        scheduler.due(40.0);
        scheduler.stop();

        assert!(scheduler.due(1000.0).is_empty());
        assert!(scheduler.is_done());
        assert!(!scheduler.is_complete());
        assert_eq!(scheduler.progress(), 0.3);
    }
}
