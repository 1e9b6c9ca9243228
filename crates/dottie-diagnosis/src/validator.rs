use dottie_core::{Result, SymptomInput, TriageError};

/// Structural checks on a request. Runs before any I/O.
pub fn validate(input: &SymptomInput) -> Result<()> {
    let positive = [
        ("cycle_length", input.cycle_length),
        ("cycle_duration", input.cycle_duration),
        ("age", input.age),
    ];
    for (field, value) in positive {
        if value <= 0 {
            return Err(TriageError::Validation(format!(
                "{} must be positive, got {}",
                field, value
            )));
        }
    }
    Ok(())
}
