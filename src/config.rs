//! Configuration for the gemask pipeline and its prompt commands

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use log::{debug, warn};

/// Environment variable consulted for the API credential
pub const CREDENTIAL_ENV_VAR: &str = "GEMINI_API_KEY";

/// Default model queried when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default prompt prepended to a selection when no
/// command-specific prompt applies
pub const DEFAULT_PROMPT: &str
  = "Explain the following text:";

/// Pipeline configuration
/// Built once at setup, read-only afterwards; every request
/// receives it by reference, no shared mutable state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GemaskConfig
{   /// Model identifier embedded in the request URL
    pub model: String
  , /// Prompt used for selection asks without a command
    pub default_prompt: String
  , /// API credential; must be non-empty before any send
    pub credential: Option<String>
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Resolve timeout in seconds
    pub timeout_secs: Option<u64>
  , /// Which transport runner executes the call
    pub transport: crate::transport::TransportKind
}

impl Default for GemaskConfig
{   fn default() -> Self
    {   GemaskConfig
        {   model: DEFAULT_MODEL.to_string()
          , default_prompt: DEFAULT_PROMPT.to_string()
          , credential: None
          , api_base: None
          , timeout_secs: None
          , transport: crate::transport::TransportKind::Curl
        }
    }
}

impl GemaskConfig
{   /// Build a configuration, reading the credential from
    /// the environment
    pub fn from_env() -> Self
    {   debug!("Loading configuration from environment");
        let credential
          = std::env::var(CREDENTIAL_ENV_VAR)
              .ok()
              .filter(|k| !k.is_empty());
        GemaskConfig
        {   credential
          , ..GemaskConfig::default()
        }
    }

    /// Explicit credential override; wins over the
    /// environment value
    pub fn with_credential(
      mut self
    , credential: String
    ) -> Self
    {   self.credential = Some(credential);
        self
    }

    /// Override the model identifier
    pub fn with_model(mut self, model: String) -> Self
    {   self.model = model;
        self
    }

    /// Select the transport runner
    pub fn with_transport(
      mut self
    , transport: crate::transport::TransportKind
    ) -> Self
    {   self.transport = transport;
        self
    }
}

/// One `{command_name, prompt_text}` pair supplied at setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec
{   /// Name the command is invoked by
    pub command_name: String
  , /// Prompt text prepended to the selected lines
    pub prompt_text: String
}

/// Registered prompt commands, looked up by name at
/// invocation time
#[derive(Debug, Clone, Default)]
pub struct CommandTable
{   entries: HashMap<String, String>
}

impl CommandTable
{   /// Register the given specs; a spec missing either field
    /// is rejected individually without aborting the others
    pub fn register(specs: Vec<CommandSpec>) -> Self
    {   let mut entries = HashMap::new();
        for spec in specs
        {   if spec.command_name.trim().is_empty()
            {   warn!(
                  "Rejecting prompt command with empty name \
                   (prompt: {:?})",
                  spec.prompt_text
                );
                continue;
            }
            if spec.prompt_text.trim().is_empty()
            {   warn!(
                  "Rejecting prompt command {:?}: empty prompt",
                  spec.command_name
                );
                continue;
            }
            debug!(
              "Registered prompt command: {}",
              spec.command_name
            );
            entries.insert(spec.command_name, spec.prompt_text);
        }
        CommandTable { entries }
    }

    /// Look up the prompt text for a command name
    pub fn prompt_for(&self, name: &str) -> Option<&str>
    {   self.entries.get(name).map(String::as_str)
    }

    /// Number of registered commands
    pub fn len(&self) -> usize
    {   self.entries.len()
    }

    /// Whether no command survived registration
    pub fn is_empty(&self) -> bool
    {   self.entries.is_empty()
    }
}
