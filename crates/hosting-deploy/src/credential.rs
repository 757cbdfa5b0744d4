use std::fmt;

use derive_more::{Display, Error, From};

use crate::helper::{Helper, HelperError};

/// Bearer credential accepted by the hosting API.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Token(String);

impl Token {
    /// Create a token from raw helper output, trimming surrounding whitespace.
    ///
    /// Returns [`CredentialError::EmptyOutput`] if nothing remains after trimming.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        match raw.trim() {
            "" => Err(CredentialError::EmptyOutput),
            token => Ok(Self(token.to_string())),
        }
    }

    /// Raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

/// Credential acquisition errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum CredentialError {
    /// Credential helper could not produce a token.
    #[display(fmt = "credential helper failed: {}", _0)]
    Helper(HelperError),

    /// Helper produced no token.
    #[display(fmt = "credential helper returned an empty token")]
    EmptyOutput,
}

/// Source of bearer credentials for the hosting API.
pub(crate) trait CredentialProvider {
    /// Obtain a single-use credential.
    fn acquire(&self) -> Result<Token, CredentialError>;
}

/// Credential provider backed by an external CLI helper that prints
/// a token to its standard output.
pub(crate) struct CommandCredentialProvider {
    /// Helper invocation.
    helper: Helper,
}

impl CommandCredentialProvider {
    /// Create a provider that runs `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            helper: Helper::new(program, args),
        }
    }
}

impl CredentialProvider for CommandCredentialProvider {
    fn acquire(&self) -> Result<Token, CredentialError> {
        let stdout = self.helper.output()?;

        Token::parse(&String::from_utf8_lossy(&stdout))
    }
}

/// Credential provider returning a token supplied by configuration.
pub(crate) struct StaticCredentialProvider {
    /// Configured token value.
    token: String,
}

impl StaticCredentialProvider {
    /// Create a provider returning `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn acquire(&self) -> Result<Token, CredentialError> {
        Token::parse(&self.token)
    }
}
