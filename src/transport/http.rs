//! reqwest in-process transport runner
//!
//! Speaks the same outcome alphabet as the curl runner: the
//! response body arrives as a stdout chunk, a network failure
//! as a stderr chunk plus a nonzero exit. The resolver never
//! knows which runner produced the stream.

use log::{debug, error, trace};

pub struct HttpTransport
{   http_client: reqwest::Client
}

impl HttpTransport
{   pub fn new() -> Self
    {   debug!("Creating HttpTransport");
        HttpTransport
        {   http_client: reqwest::Client::new()
        }
    }

    /// Start the POST and return its outcome stream without
    /// blocking
    pub fn dispatch(
      &self
    , url: &str
    , body: &str
    ) -> Result<
        super::OutcomeReceiver,
        crate::error::Error
      >
    {   let client = self.http_client.clone();
        let url = url.to_string();
        let body = body.to_string();
        let (tx, rx)
          = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
          let result = client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

          match result
          {   Ok(response) => {
                // A non-2xx status still carries the API's
                // JSON error envelope in the body; deliver it
                // on stdout and let the resolver classify it
                let status = response.status();
                trace!("HTTP status: {}", status);
                match response.text().await
                {   Ok(text) => {
                      let _ = tx.send(
                        crate::TransportOutcome
                          ::StdoutChunk(text)
                      );
                      let _ = tx.send(
                        crate::TransportOutcome::Exit(0)
                      );
                    }
                  , Err(e) => {
                      error!("Body read failed: {}", e);
                      let _ = tx.send(
                        crate::TransportOutcome
                          ::StderrChunk(e.to_string())
                      );
                      let _ = tx.send(
                        crate::TransportOutcome::Exit(1)
                      );
                    }
                }
              }
            , Err(e) => {
                error!("HTTP request failed: {}", e);
                let _ = tx.send(
                  crate::TransportOutcome
                    ::StderrChunk(e.to_string())
                );
                let _ = tx.send(
                  crate::TransportOutcome::Exit(1)
                );
              }
          }
        });

        Ok(rx)
    }
}

impl Default for HttpTransport
{   fn default() -> Self
    {   HttpTransport::new()
    }
}
