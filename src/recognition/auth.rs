/// Supplies the credential attached to recognition requests
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` to send the request unauthenticated
    fn token(&self) -> Option<String>;
}

/// Token fixed at construction time (from configuration)
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

#[derive(Debug, Default, Clone)]
pub struct NoTokenProvider;

impl TokenProvider for NoTokenProvider {
    fn token(&self) -> Option<String> {
        None
    }
}
