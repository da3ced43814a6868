use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    AuthError(String),
    NetworkError(String),
    RateLimited(String),
    EmptyResponse(String),
    UnsupportedModel(String),
    ApiError(String),
    ParseError(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited(msg) => write!(f, "Rate limit error: {}", msg),
            Self::EmptyResponse(msg) => write!(f, "Empty response: {}", msg),
            Self::UnsupportedModel(msg) => write!(f, "Unsupported model: {}", msg),
            Self::ApiError(msg) => write!(f, "API error: {}", msg),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}
