use std::fmt;

/// Carries enough of a failed completion to diagnose it from logs alone.
#[derive(Debug, Clone)]
pub struct LlmError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM error (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for LlmError {}
