pub type RevealResult<T> = Result<T, RevealError>;

#[derive(thiserror::Error, Debug)]
pub enum RevealError {
    #[error("missing target: {0}")]
    MissingTarget(String),

    #[error("timeline error: {0}")]
    Timeline(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RevealError {
    pub fn missing_target(msg: impl Into<String>) -> Self {
        Self::MissingTarget(msg.into())
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for RevealError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RevealError::missing_target("x")
                .to_string()
                .contains("missing target:")
        );
        assert!(
            RevealError::timeline("x")
                .to_string()
                .contains("timeline error:")
        );
        assert!(
            RevealError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            RevealError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RevealError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn json_errors_map_to_serde() {
        let err: RevealError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, RevealError::Serde(_)));
    }
}
