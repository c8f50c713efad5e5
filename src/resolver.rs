//! Response resolver state machine
//!
//! Consumes the three outcome streams of one transport
//! invocation and decides the single rendering for it.
//! Pending -> Resolved is a latch: the first authoritative
//! transition wins and later outcomes never replace it.
//!
//! Precedence: decodable stdout JSON is authoritative (the
//! API can emit a well-formed error envelope with exit code 0,
//! and some transports write noise to stderr even on success);
//! stderr diagnostics count only when stdout decoded to
//! nothing; a bare nonzero exit code is the last resort.

use serde_json::Value;
use std::time::Duration;
use log::{debug, trace, warn};

/// Exit code recorded when the resolve window elapses,
/// mirroring timeout(1)
const TIMEOUT_EXIT_CODE: i32 = 124;

/// The single final classification of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResponse
{   /// Decoded answer text from the success envelope
    Answer(String)
  , /// The service declined or failed the request
    ApiError
    {   message: String
      , raw_body: String
    }
  , /// A body arrived but matched no expected shape
    MalformedResponse(String)
  , /// The call itself failed, or stderr diagnostics with no
    /// decodable stdout
    TransportError(String)
  , /// Nonzero exit with no other signal
    ProcessFailure(i32)
}

impl ResolvedResponse
{   /// User-visible markdown for the display surface; every
    /// variant renders as text, never as a fault
    pub fn render(&self) -> String
    {   match self
        {   ResolvedResponse::Answer(text) => {
              text.clone()
            }
          , ResolvedResponse::ApiError { message, raw_body } => {
              format!(
                "**API error:** {}\n\n```\n{}\n```",
                message,
                raw_body.trim()
              )
            }
          , ResolvedResponse::MalformedResponse(raw) => {
              if raw.is_empty()
              {   "**Empty response from the API**"
                    .to_string()
              } else
              {   format!(
                    "**Unexpected response shape:**\
                     \n\n```\n{}\n```",
                    raw.trim()
                  )
              }
            }
          , ResolvedResponse::TransportError(diag) => {
              format!("**Transport error:** {}", diag)
            }
          , ResolvedResponse::ProcessFailure(code) => {
              format!("**Transport exited with code {}**", code)
            }
        }
    }
}

/// Final result of one request: the latched response plus an
/// optional non-authoritative late-exit annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution
{   pub response: ResolvedResponse
  , pub late_exit: Option<i32>
}

impl Resolution
{   pub fn render(&self) -> String
    {   let mut text = self.response.render();
        if let Some(code) = self.late_exit
        {   text.push_str(&format!(
              "\n\n_(transport later exited with code {})_",
              code
            ));
        }
        text
    }
}

/// State machine for one request
pub struct ResponseResolver
{   stdout_buf: String
  , stderr_buf: String
  , resolved: Option<ResolvedResponse>
  , late_exit: Option<i32>
}

impl ResponseResolver
{   pub fn new() -> Self
    {   ResponseResolver
        {   stdout_buf: String::new()
          , stderr_buf: String::new()
          , resolved: None
          , late_exit: None
        }
    }

    /// Whether the latch has been taken
    pub fn is_resolved(&self) -> bool
    {   self.resolved.is_some()
    }

    /// The latched response, if any
    pub fn resolution(&self) -> Option<&ResolvedResponse>
    {   self.resolved.as_ref()
    }

    /// Feed one outcome through the transition rules
    pub fn observe(
      &mut self
    , outcome: crate::TransportOutcome
    )
    {   match outcome
        {   crate::TransportOutcome::StdoutChunk(text) => {
              trace!("stdout chunk: {} bytes", text.len());
              // Chunk boundaries carry no meaning; decode is
              // always attempted against the whole buffer
              self.stdout_buf.push_str(&text);
              if self.resolved.is_some()
              {   return;
              }
              let body = self.stdout_buf.trim();
              if let Ok(value)
                = serde_json::from_str::<Value>(body)
              {   debug!("stdout decoded, latching");
                  self.resolved
                    = Some(classify(&value, body));
              }
              // An undecodable buffer may still be a partial
              // document; it is classified at Exit
            }
          , crate::TransportOutcome::StderrChunk(text) => {
              trace!("stderr chunk: {} bytes", text.len());
              // Advisory only: consulted at stream end, and
              // never over a decoded stdout result
              self.stderr_buf.push_str(&text);
            }
          , crate::TransportOutcome::Exit(code) => {
              debug!("transport exit: {}", code);
              if self.resolved.is_some()
              {   if code != 0
                  {   // Annotate, never replace
                      self.late_exit = Some(code);
                  }
                  return;
              }
              let diag = self.stderr_buf.trim();
              self.resolved = Some(
                if !diag.is_empty()
                {   ResolvedResponse::TransportError(
                      diag.to_string()
                    )
                } else if code != 0
                {   ResolvedResponse::ProcessFailure(code)
                } else
                {   // Covers undecodable stdout and the
                    // empty-response edge case
                    ResolvedResponse::MalformedResponse(
                      self.stdout_buf.trim().to_string()
                    )
                }
              );
            }
        }
    }

    /// Latch a timeout, subject to the same first-wins rule
    pub fn latch_timeout(&mut self)
    {   if self.resolved.is_none()
        {   warn!("Resolve window elapsed, latching timeout");
            self.resolved = Some(
              ResolvedResponse::ProcessFailure(
                TIMEOUT_EXIT_CODE
              )
            );
        }
    }

    /// Consume the machine once the stream has ended
    pub fn finish(self) -> Resolution
    {   let response = self.resolved.unwrap_or_else(|| {
          warn!("Outcome stream ended without an exit code");
          ResolvedResponse::TransportError(
            "transport stream ended without an exit code"
              .to_string()
          )
        });
        Resolution
        {   response
          , late_exit: self.late_exit
        }
    }
}

impl Default for ResponseResolver
{   fn default() -> Self
    {   ResponseResolver::new()
    }
}

/// Classify a decoded stdout document
fn classify(value: &Value, raw: &str) -> ResolvedResponse
{   if let Some(text) = value
      .pointer("/candidates/0/content/parts/0/text")
      .and_then(Value::as_str)
    {   return ResolvedResponse::Answer(text.to_string());
    }

    if let Some(message) = value
      .pointer("/error/message")
      .and_then(Value::as_str)
    {   return ResolvedResponse::ApiError
        {   message: message.to_string()
          , raw_body: raw.to_string()
        };
    }

    ResolvedResponse::MalformedResponse(raw.to_string())
}

/// Drive one outcome stream to its resolution.
///
/// Exit is the stream's final event, so the loop stops there;
/// the optional window bounds the whole wait and latches a
/// timeout when it elapses.
pub async fn resolve(
  mut rx: crate::transport::OutcomeReceiver
, window: Option<Duration>
) -> Resolution
{   let mut resolver = ResponseResolver::new();
    let deadline
      = window.map(|w| tokio::time::Instant::now() + w);

    loop
    {   let next = match deadline
        {   Some(at) => {
              match tokio::time::timeout_at(
                at,
                rx.recv()
              ).await
              {   Ok(next) => next
                , Err(_) => {
                    resolver.latch_timeout();
                    break;
                  }
              }
            }
          , None => rx.recv().await
        };

        match next
        {   Some(outcome) => {
              let is_exit = matches!(
                outcome,
                crate::TransportOutcome::Exit(_)
              );
              resolver.observe(outcome);
              if is_exit
              {   break;
              }
            }
          , None => break
        }
    }

    resolver.finish()
}
