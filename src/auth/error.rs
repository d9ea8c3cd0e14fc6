#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The consumer key no longer resolves to an active client.
    ConsumerKeyRejected,
}

impl AuthorizationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsumerKeyRejected => "consumer_key_rejected",
        }
    }
}

impl std::fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub struct AuthorizationError {
    #[serde(rename = "error")]
    pub code: AuthorizationErrorCode,
    #[serde(rename = "error_description")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuthorizationError {
    pub fn new(code: AuthorizationErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: Some(description.into()),
        }
    }

    pub fn consumer_key_rejected() -> Self {
        Self::new(
            AuthorizationErrorCode::ConsumerKeyRejected,
            "Unauthorized client",
        )
    }

    pub fn code(&self) -> &'static str {
        self.code.as_str()
    }
}

impl std::fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => f.write_str(description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for AuthorizationError {}

impl From<AuthorizationErrorCode> for AuthorizationError {
    fn from(code: AuthorizationErrorCode) -> Self {
        Self {
            code,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_consumer_code() {
        let e = AuthorizationError::consumer_key_rejected();
        assert_eq!(e.code(), "consumer_key_rejected");
        assert_eq!(e.to_string(), "Unauthorized client");
    }

    #[test]
    fn display_falls_back_to_code() {
        let e: AuthorizationError = AuthorizationErrorCode::ConsumerKeyRejected.into();
        assert_eq!(e.to_string(), "consumer_key_rejected");
    }

    #[test]
    fn serializes_as_oauth_problem() {
        let value = serde_json::to_value(AuthorizationError::consumer_key_rejected()).unwrap();
        assert_eq!(value["error"], "consumer_key_rejected");
        assert_eq!(value["error_description"], "Unauthorized client");
    }
}
