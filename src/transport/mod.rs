//! Transport runners: execute one call per request and feed
//! the resolver its three outcome streams

pub mod curl;
pub mod http;

pub use curl::CurlTransport;
pub use http::HttpTransport;

use serde::{Deserialize, Serialize};

/// Receiver half of a transport invocation's outcome stream
pub type OutcomeReceiver
  = tokio::sync::mpsc::UnboundedReceiver<
      crate::TransportOutcome
    >;

/// Sender half, owned by the running transport
pub type OutcomeSender
  = tokio::sync::mpsc::UnboundedSender<
      crate::TransportOutcome
    >;

/// Which runner executes the call
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize
)]
pub enum TransportKind
{   /// One curl helper process per request
    Curl
  , /// One in-process reqwest call per request
    Http
}

/// A constructed transport runner
pub enum Transport
{   Curl(CurlTransport)
  , Http(HttpTransport)
}

impl Transport
{   pub fn new(kind: TransportKind) -> Self
    {   match kind
        {   TransportKind::Curl => {
              Transport::Curl(CurlTransport::new())
            }
          , TransportKind::Http => {
              Transport::Http(HttpTransport::new())
            }
        }
    }

    /// Start the call and return its outcome stream without
    /// blocking; the stream always terminates with Exit
    pub fn dispatch(
      &self
    , url: &str
    , body: &str
    ) -> Result<OutcomeReceiver, crate::error::Error>
    {   match self
        {   Transport::Curl(t) => t.dispatch(url, body)
          , Transport::Http(t) => t.dispatch(url, body)
        }
    }
}
