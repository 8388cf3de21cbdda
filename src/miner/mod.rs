//! Interfaces to the mining core.
//!
//! The gateway does not scan plots or compute deadlines itself. It reads a
//! hot-swapped snapshot of the current block and hands candidate nonces to
//! a scoring pipeline behind a channel, awaiting each verdict per request.

mod pipeline;
mod state;

pub use pipeline::{
    spawn_best_deadline_scorer, SubmissionCandidate, SubmissionJob, SubmissionOutcome,
    SubmissionPipeline,
};
pub use state::{MinerState, MiningInfo};

/// Format a deadline in seconds for humans: `3y 2m 1d 07:12:33`, with the
/// leading calendar units omitted while they are zero.
pub fn deadline_format(seconds: u64) -> String {
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = months / 12;

    let mut out = String::new();
    if years > 0 {
        out.push_str(&format!("{}y ", years));
    }
    if months > 0 {
        out.push_str(&format!("{}m ", months % 12));
    }
    if days > 0 {
        out.push_str(&format!("{}d ", days % 30));
    }
    out.push_str(&format!(
        "{:02}:{:02}:{:02}",
        hours % 24,
        minutes % 60,
        seconds % 60
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_format_clock_only() {
        assert_eq!(deadline_format(0), "00:00:00");
        assert_eq!(deadline_format(3661), "01:01:01");
    }

    #[test]
    fn test_deadline_format_with_calendar_units() {
        // 1 day, 1 hour, 1 minute, 1 second
        assert_eq!(deadline_format(90_061), "1d 01:01:01");
        // 13 months wrap into a year; the day counter still shows
        let thirteen_months = 13 * 30 * 86_400;
        assert_eq!(deadline_format(thirteen_months), "1y 1m 0d 00:00:00");
    }
}
