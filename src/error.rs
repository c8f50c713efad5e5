use std::fmt;

/// Custom error type for gemask operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Credential is missing or empty
    MissingCredential
  , /// Question text was empty
    EmptyQuestion
  , /// Selected text for a prompt command was empty
    EmptySelection(String)
  , /// No prompt command registered under this name
    UnknownCommand(String)
  , /// Request body could not be serialized
    EncodingError(String)
  , /// Transport helper could not be started
    SpawnFailed(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Timeout error
    Timeout
  , /// Backend channel closed
    Disconnected
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingCredential => {
              write!(f,
                "No API credential configured; \
                 set GEMINI_API_KEY or supply one at setup"
              )
            }
          , Error::EmptyQuestion => {
              write!(f, "Question is empty")
            }
          , Error::EmptySelection(command) => {
              write!(f,
                "Nothing selected for command: {}",
                command
              )
            }
          , Error::UnknownCommand(name) => {
              write!(f, "Unknown prompt command: {}", name)
            }
          , Error::EncodingError(msg) => {
              write!(f, "Encoding error: {}", msg)
            }
          , Error::SpawnFailed(msg) => {
              write!(f, "Transport failed to start: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Disconnected => {
              write!(f, "Backend disconnected")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
