//! Frame cadence.
//!
//! Decides, once per control-loop iteration, which frames are due. A log holds
//! one `I` frame every ~32 ms of flight, `P` frames at the configured ratio in
//! between, and an `S` frame at least every 256 intra intervals.
//!
//! | Interval | Value |
//! |----------|-------|
//! | intra | `32000 / looptime_us`, at least 1 |
//! | inter | 0 when `p_ratio == 0`, else `intra / p_ratio`, at least 1 |
//! | slow | `intra * 256` |

/// Time between an intra frame and the next, in milliseconds.
const INTRA_PERIOD_MS: u32 = 32;

/// Slow frames are forced after this many intra intervals.
const SLOW_INTRA_MULTIPLE: u32 = 256;

/// GPS home is re-sent on every this many intra frames.
const GPS_HOME_INTRA_PERIOD: u32 = 128;

/// Frame intervals derived from the loop time and `p_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIntervals {
    /// Iterations between `I` frames.
    pub intra: u32,
    /// Iterations between `P` frames, 0 when only `I` frames are logged.
    pub inter: u32,
    /// Iterations after which an `S` frame is forced.
    pub slow: u32,
}

impl FrameIntervals {
    pub fn new(looptime_us: u32, p_ratio: u16) -> Self {
        let intra = (INTRA_PERIOD_MS * 1000 / looptime_us.max(1)).max(1);
        let p_ratio = u32::from(p_ratio);
        let inter = if p_ratio == 0 {
            0
        } else if p_ratio > intra && intra >= INTRA_PERIOD_MS {
            1
        } else {
            (intra / p_ratio).max(1)
        };
        Self {
            intra,
            inter,
            slow: intra * SLOW_INTRA_MULTIPLE,
        }
    }

    /// Frames logged per `denom` iterations, scaled by `num`.
    pub fn p_denom(&self, num: u32, denom: u32) -> u32 {
        if denom == 0 {
            return 0;
        }
        self.intra * num / denom
    }
}

/// Iteration counters advanced once per logged iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationTimers {
    pub iteration: u32,
    /// Position inside the current intra interval.
    pub loop_index: u32,
    /// Number of intra intervals completed.
    pub intra_index: u32,
    /// Position inside the current inter interval.
    pub p_index: u32,
    /// Iterations since the last `S` frame.
    pub slow_timer: u32,
}

impl IterationTimers {
    pub fn advance(&mut self, intervals: &FrameIntervals) {
        self.slow_timer = self.slow_timer.wrapping_add(1);
        self.iteration = self.iteration.wrapping_add(1);

        self.loop_index += 1;
        if self.loop_index >= intervals.intra {
            self.loop_index = 0;
            self.intra_index = self.intra_index.wrapping_add(1);
            self.p_index = 0;
        } else {
            self.p_index += 1;
            if self.p_index >= intervals.inter {
                self.p_index = 0;
            }
        }
    }

    #[inline]
    pub fn is_intra(&self) -> bool {
        self.loop_index == 0
    }

    #[inline]
    pub fn is_inter(&self, intervals: &FrameIntervals) -> bool {
        intervals.inter != 0 && self.p_index == 0
    }

    #[inline]
    pub fn slow_due(&self, intervals: &FrameIntervals) -> bool {
        self.slow_timer >= intervals.slow
    }

    /// Force the next slow-frame check to write.
    pub fn force_slow(&mut self, intervals: &FrameIntervals) {
        self.slow_timer = intervals.slow;
    }

    /// Periodic GPS home refresh, halfway through every 128th intra interval.
    pub fn gps_home_due(&self, intervals: &FrameIntervals) -> bool {
        self.p_index == intervals.intra / 2 && self.intra_index % GPS_HOME_INTRA_PERIOD == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_intervals() {
        let i = FrameIntervals::new(1000, 32);
        assert_eq!(i, FrameIntervals { intra: 32, inter: 1, slow: 8192 });

        assert_eq!(FrameIntervals::new(1000, 16).inter, 2);
        assert_eq!(FrameIntervals::new(1000, 64).inter, 1);
        assert_eq!(FrameIntervals::new(1000, 0).inter, 0);
        assert_eq!(FrameIntervals::new(250, 32).intra, 128);
        assert_eq!(FrameIntervals::new(250, 32).inter, 4);
        // Slow loops still log one frame per iteration.
        assert_eq!(FrameIntervals::new(100_000, 32).intra, 1);
        assert_eq!(FrameIntervals::new(2000, 32).inter, 1);
    }

    #[test]
    fn test_p_denom() {
        let i = FrameIntervals::new(1000, 32);
        assert_eq!(i.p_denom(1, 2), 16);
        assert_eq!(i.p_denom(1, 0), 0);
    }

    #[test]
    fn test_cadence_one_in_four() {
        let intervals = FrameIntervals::new(1000, 8);
        assert_eq!(intervals.inter, 4);

        let mut timers = IterationTimers::default();
        let mut pattern = Vec::new();
        for _ in 0..40 {
            pattern.push(if timers.is_intra() {
                'I'
            } else if timers.is_inter(&intervals) {
                'P'
            } else {
                '.'
            });
            timers.advance(&intervals);
        }
        let pattern: String = pattern.into_iter().collect();
        assert_eq!(pattern, "I...P...P...P...P...P...P...P...I...P...");
        assert_eq!(timers.intra_index, 1);
        assert_eq!(timers.iteration, 40);
    }

    #[test]
    fn test_intra_only() {
        let intervals = FrameIntervals::new(1000, 0);
        let mut timers = IterationTimers::default();
        for _ in 0..64 {
            assert!(!timers.is_inter(&intervals));
            timers.advance(&intervals);
        }
        assert_eq!(timers.intra_index, 2);
    }

    #[test]
    fn test_slow_timer() {
        let intervals = FrameIntervals::new(1000, 32);
        let mut timers = IterationTimers::default();
        assert!(!timers.slow_due(&intervals));
        timers.force_slow(&intervals);
        assert!(timers.slow_due(&intervals));
    }

    #[test]
    fn test_gps_home_due() {
        let intervals = FrameIntervals::new(1000, 1);
        assert_eq!(intervals.inter, 32);
        let mut timers = IterationTimers::default();
        let mut due = Vec::new();
        for n in 0..(32 * 129) {
            if timers.gps_home_due(&intervals) {
                due.push(n);
            }
            timers.advance(&intervals);
        }
        assert_eq!(due, vec![16, 128 * 32 + 16]);
    }
}
