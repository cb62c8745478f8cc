//! Wall clock statistics for benchmark stages.

use std::time::Duration;

/// Running min, max and mean of one stage's duration.
#[derive(Debug, Clone, Copy)]
pub struct StageStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
}

impl Default for StageStats {
    fn default() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
        }
    }
}

impl StageStats {
    /// Records one measurement.
    pub fn update(&mut self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        self.sum = self.sum.saturating_add(nanos);
        self.count += 1;
    }

    /// Mean duration in nanoseconds, 0.0 before the first measurement.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints one report row, switching to microseconds or milliseconds
    /// once the mean is large enough.
    pub fn print_row(&self, stage: &str) {
        if self.count == 0 {
            println!("{stage:<12} (no samples)");
            return;
        }
        let avg = self.avg();
        let (scale, unit) = if avg < 1e3 {
            (1.0, "ns")
        } else if avg < 1e6 {
            (1e3, "us")
        } else {
            (1e6, "ms")
        };
        println!(
            "{stage:<12} min {:>10.2} {unit}  avg {:>10.2} {unit}  max {:>10.2} {unit}",
            self.min as f64 / scale,
            avg / scale,
            self.max as f64 / scale,
        );
    }
}
