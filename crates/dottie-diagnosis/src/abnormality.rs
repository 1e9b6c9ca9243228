use dottie_core::{Abnormality, NormalRange, SymptomInput, CYCLE_DURATION, CYCLE_LENGTH};

pub const ABNORMAL_CYCLE_LENGTH: &str = "Abnormal Cycle Length";
pub const ABNORMAL_CYCLE_DURATION: &str = "Abnormal Cycle Duration";

fn label_for(parameter: &str) -> Option<&'static str> {
    match parameter {
        CYCLE_LENGTH => Some(ABNORMAL_CYCLE_LENGTH),
        CYCLE_DURATION => Some(ABNORMAL_CYCLE_DURATION),
        _ => None,
    }
}

/// Compares the input against every range it has a parameter for, in range order.
/// Ranges for parameters the input does not carry are skipped.
pub fn detect(input: &SymptomInput, ranges: &[NormalRange]) -> Vec<Abnormality> {
    ranges
        .iter()
        .filter_map(|range| {
            let value = input.parameter(&range.name)?;
            let label = label_for(&range.name)?;
            (!range.contains(value)).then(|| Abnormality {
                description: label.to_string(),
                parameter: range.name.clone(),
            })
        })
        .collect()
}
