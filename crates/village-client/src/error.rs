use std::fmt;

/// Generic notice for transport failures.
pub const UNREACHABLE_MESSAGE: &str = "Cannot reach server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No response at all (connect, timeout, reset).
    Transport(String),
    /// The server answered with a non-success status.
    Rejected { status: u16, message: Option<String> },
    /// The bearer token was refused; the login is gone.
    Unauthorized,
    /// A success response whose body could not be understood.
    Decode(String),
    /// An authenticated operation was attempted without a credential.
    MissingCredential,
    /// Local input failed validation before any request was made.
    Invalid(String),
    Config(String),
    Storage(String),
    Channel(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Rejected {
                status,
                message: Some(m),
            } => write!(f, "rejected ({status}): {m}"),
            Self::Rejected {
                status,
                message: None,
            } => write!(f, "rejected ({status})"),
            Self::Unauthorized => write!(f, "session is no longer authorized"),
            Self::Decode(e) => write!(f, "unexpected response body: {e}"),
            Self::MissingCredential => write!(f, "not logged in"),
            Self::Invalid(m) => write!(f, "{m}"),
            Self::Config(m) => write!(f, "config error: {m}"),
            Self::Storage(m) => write!(f, "credential storage error: {m}"),
            Self::Channel(m) => write!(f, "real-time channel error: {m}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Text to show the user, using `fallback` when the server gave none.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Transport(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::Rejected {
                message: Some(m), ..
            } => m.clone(),
            Self::Invalid(m) => m.clone(),
            Self::MissingCredential | Self::Unauthorized => "Please log in again".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
