pub mod error;
pub mod config;
pub mod transport;
pub mod request;
pub mod resolver;
pub mod surface;
pub mod client;

/*

gemask (Gemini ask): an async-only rust library that takes a
typed question or a selection of lines, posts it to the Gemini
generateContent endpoint without blocking the caller, and
resolves the three completion signals (stdout, stderr, exit
code) into exactly one rendered answer for a display surface.

gemask/
├── Cargo.toml          # Main manifest
├── src/
│   ├── lib.rs          # Re-exports and channel API surface
│   ├── error.rs        # Custom error types and handling
│   ├── config.rs       # Configuration and prompt command table
│   ├── request.rs      # Gemini wire types and request builder
│   ├── transport/      # Transport runners
│   │   ├── mod.rs      # TransportKind and re-exports
│   │   ├── curl.rs     # curl helper-process runner
│   │   └── http.rs     # reqwest in-process runner
│   ├── resolver.rs     # Response resolver state machine
│   ├── surface.rs      # Display surface contract
│   └── client.rs       # Backend actor and pipeline
└── tests/              # Integration tests

*/

/// GEMASK API INTERFACE:

// ===== Ask =====

pub type AskReply
  = Result<crate::resolver::Resolution, crate::error::Error>;
pub type AskReplySender
  = tokio::sync::mpsc::UnboundedSender<AskReply>;

pub struct AskArgs
{   pub question: String
  , pub reply: AskReplySender
}

// ===== AskSelection =====

pub struct AskSelectionArgs
{   pub command_name: String
  , pub lines: Vec<String>
  , pub reply: AskReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== GemaskHand (sender side) =====

pub struct GemaskHand
{   pub ask_tx
      : tokio::sync::mpsc::UnboundedSender<AskArgs>
  , pub ask_selection_tx
      : tokio::sync::mpsc::UnboundedSender<AskSelectionArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== GemaskFoot (receiver side) =====

pub struct GemaskFoot
{   pub ask_rx
      : tokio::sync::mpsc::UnboundedReceiver<AskArgs>
  , pub ask_selection_rx
      : tokio::sync::mpsc::UnboundedReceiver<AskSelectionArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// GEMASK STRUCTURES:

/// One completion signal from a transport invocation.
/// A given invocation emits any interleaving of chunks; Exit
/// always arrives last. The transport runner exclusively owns
/// production, the resolver only observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome
{   /// A chunk of response-body bytes (decoded as UTF-8)
    StdoutChunk(String)
  , /// A chunk of diagnostic output
    StderrChunk(String)
  , /// Final exit code of the invocation
    Exit(i32)
}

pub use config::{CommandSpec, CommandTable, GemaskConfig};
pub use client::GemaskBackend;
pub use resolver::{Resolution, ResolvedResponse};
pub use surface::{BufferSurface, DisplaySurface};
