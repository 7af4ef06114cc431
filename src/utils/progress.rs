use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub rows_done: usize,
    pub total_rows: usize,
    /// In `(0, 1]` once at least one row is done.
    pub fraction: f64,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    /// `H:MM:SS`
    pub remaining: String,
}

/// Linear extrapolation of the remaining time: `elapsed / fraction - elapsed`, floored at 0.
pub fn on_row_complete(rows_done: usize, total_rows: usize, elapsed_secs: f64) -> ProgressUpdate {
    let (fraction, remaining_secs) = if rows_done == 0 || total_rows == 0 {
        (0.0, 0.0)
    } else {
        let fraction = (rows_done as f64 / total_rows as f64).min(1.0);
        let estimated_total = elapsed_secs / fraction;
        (fraction, (estimated_total - elapsed_secs).max(0.0))
    };

    ProgressUpdate {
        rows_done,
        total_rows,
        fraction,
        elapsed_secs,
        remaining_secs,
        remaining: format_hms(remaining_secs),
    }
}

/// Whole seconds as `H:MM:SS`. Hours keep counting past 24.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_rows: usize,
    rows_done: usize,
    started: Instant,
}

impl ProgressTracker {
    pub fn start(total_rows: usize) -> Self {
        Self {
            total_rows,
            rows_done: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn rows_done(&self) -> usize {
        self.rows_done
    }

    pub fn row_completed(&mut self) -> ProgressUpdate {
        self.rows_done += 1;
        on_row_complete(self.rows_done, self.total_rows, self.elapsed().as_secs_f64())
    }
}
