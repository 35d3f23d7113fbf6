use serde::{Serialize, Serializer};
use std::time::Duration;

/// Summary of one completed pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionReport {
    pub rows_read: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub workers: usize,
    pub batches: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

impl CompletionReport {
    /// Records that went through validation (malformed rows excluded).
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total() as f64 / secs
        } else {
            0.0
        }
    }

    /// One-line summary for `-v` output.
    pub fn format_summary(&self) -> String {
        let mut output = format!(
            "Records processed: {} total, {} accepted, {} rejected",
            self.total(),
            self.accepted,
            self.rejected
        );

        if self.malformed > 0 {
            output.push_str(&format!(", {} malformed", self.malformed));
        }

        output.push_str(&format!(" in {}ms", self.elapsed.as_millis()));

        let rate = self.records_per_second();
        if rate > 0.0 {
            output.push_str(&format!(" ({:.0} records/s)", rate));
        }

        output
    }

    /// Boxed report printed by `--report`.
    pub fn format_report(&self) -> String {
        let rule = "-------------------------------------";
        let mut output = String::new();

        output.push_str(rule);
        output.push_str("\n         Completion Report\n");
        output.push_str(rule);
        output.push('\n');
        output.push_str(&format!("Total records: {}\n", self.total()));
        output.push_str(&format!("Succeeded: {}\n", self.accepted));
        output.push_str(&format!("Failed: {}\n", self.rejected));
        if self.malformed > 0 {
            output.push_str(&format!("Malformed: {}\n", self.malformed));
        }
        output.push_str(rule);
        output.push('\n');
        output.push_str(&format!("Workers: {}\n", self.workers));
        output.push_str(&format!(
            "Took: {}\n",
            humantime::format_duration(truncate_to_micros(self.elapsed))
        ));
        output.push_str(&format!(
            "Speed: {:.2} records per second\n",
            self.records_per_second()
        ));
        output.push_str(rule);
        output
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// humantime prints every unit down to nanoseconds otherwise
fn truncate_to_micros(elapsed: Duration) -> Duration {
    Duration::from_micros(elapsed.as_micros() as u64)
}
