use std::time::Duration;

/// Wall-clock cost of each stage for a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimes {
    pub read: Duration,
    pub resize: Duration,
    pub detect: Duration,
    pub annotate: Duration,
    pub write: Duration,
}

impl FrameTimes {
    pub fn total(&self) -> Duration {
        self.read + self.resize + self.detect + self.annotate + self.write
    }

    fn zip_with(&self, other: &Self, f: impl Fn(Duration, Duration) -> Duration) -> Self {
        Self {
            read: f(self.read, other.read),
            resize: f(self.resize, other.resize),
            detect: f(self.detect, other.detect),
            annotate: f(self.annotate, other.annotate),
            write: f(self.write, other.write),
        }
    }
}

/// Per-frame timings collected over a whole video.
#[derive(Debug, Default)]
pub struct AggregatedTimes {
    frames: Vec<FrameTimes>,
}

impl AggregatedTimes {
    pub fn push(&mut self, times: FrameTimes) {
        self.frames.push(times);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The first frame pays for lazy session init, so callers usually skip it.
    fn samples(&self, skip_first: bool) -> &[FrameTimes] {
        match (skip_first, self.frames.len()) {
            (true, n) if n > 1 => &self.frames[1..],
            _ => &self.frames,
        }
    }

    pub fn avg(&self, skip_first: bool) -> FrameTimes {
        let samples = self.samples(skip_first);
        if samples.is_empty() {
            return FrameTimes::default();
        }
        let sum = samples
            .iter()
            .fold(FrameTimes::default(), |acc, t| acc.zip_with(t, |a, b| a + b));
        let n = samples.len() as u32;
        sum.zip_with(&sum, |a, _| a / n)
    }

    pub fn min(&self, skip_first: bool) -> FrameTimes {
        self.reduce(skip_first, Duration::min)
    }

    pub fn max(&self, skip_first: bool) -> FrameTimes {
        self.reduce(skip_first, Duration::max)
    }

    fn reduce(&self, skip_first: bool, f: fn(Duration, Duration) -> Duration) -> FrameTimes {
        let mut samples = self.samples(skip_first).iter();
        match samples.next() {
            Some(first) => samples.fold(*first, |acc, t| acc.zip_with(t, f)),
            None => FrameTimes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn detect_only(n: u64) -> FrameTimes {
        FrameTimes {
            detect: ms(n),
            ..Default::default()
        }
    }

    #[test]
    fn test_avg_skips_warmup_frame() {
        let mut agg = AggregatedTimes::default();
        agg.push(detect_only(500));
        agg.push(detect_only(10));
        agg.push(detect_only(30));
        assert_eq!(agg.avg(true).detect, ms(20));
        assert_eq!(agg.avg(false).detect, ms(180));
    }

    #[test]
    fn test_min_max() {
        let mut agg = AggregatedTimes::default();
        for n in [500, 10, 30, 20] {
            agg.push(detect_only(n));
        }
        assert_eq!(agg.min(true).detect, ms(10));
        assert_eq!(agg.max(true).detect, ms(30));
        assert_eq!(agg.max(false).detect, ms(500));
    }

    #[test]
    fn test_single_frame_is_not_skipped() {
        let mut agg = AggregatedTimes::default();
        agg.push(detect_only(7));
        assert_eq!(agg.avg(true).detect, ms(7));
    }

    #[test]
    fn test_empty_is_zero() {
        let agg = AggregatedTimes::default();
        assert_eq!(agg.avg(true), FrameTimes::default());
        assert_eq!(agg.min(false).total(), Duration::ZERO);
    }
}
