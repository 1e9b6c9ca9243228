use dottie_core::Condition;

pub const SEEK_ATTENTION: &str = "Seek medical attention immediately.";
pub const MONITOR: &str = "Monitor and consult a doctor if it persists.";
pub const NO_ACTION_NEEDED: &str = "No action needed";

/// One recommendation per condition, in condition order.
pub fn recommend(conditions: &[Condition]) -> Vec<String> {
    conditions
        .iter()
        .map(|condition| {
            let text = if condition.is_high_severity() {
                SEEK_ATTENTION
            } else {
                MONITOR
            };
            text.to_string()
        })
        .collect()
}
