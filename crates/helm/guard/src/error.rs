use thiserror::Error;

/// Errors from plan enrichment.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The plan is `null`, an empty object or an empty array.
    #[error("plan is empty")]
    EmptyPlan,

    #[error("failed to canonicalize plan for caching: {0}")]
    Canonicalization(#[from] serde_json::Error),
}

pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_display() {
        assert_eq!(GuardError::EmptyPlan.to_string(), "plan is empty");
    }
}
