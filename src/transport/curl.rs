//! curl helper-process transport runner

use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use log::{debug, error, trace};

const CURL_BIN: &str = "curl";

/// Runs one curl process per request and streams its stdout,
/// stderr, and exit code as TransportOutcome events
pub struct CurlTransport
{   curl_bin: String
}

impl CurlTransport
{   pub fn new() -> Self
    {   CurlTransport
        {   curl_bin: CURL_BIN.to_string()
        }
    }

    /// Use a non-default curl binary
    pub fn with_binary(curl_bin: String) -> Self
    {   CurlTransport { curl_bin }
    }

    /// Spawn the helper process and return its outcome stream.
    ///
    /// The body travels as one argv element, never through a
    /// shell, so embedded quotes reach curl verbatim. A spawn
    /// failure (binary missing) is the one error reported here
    /// rather than on the stream.
    pub fn dispatch(
      &self
    , url: &str
    , body: &str
    ) -> Result<
        super::OutcomeReceiver,
        crate::error::Error
      >
    {   debug!("Spawning {} for request", self.curl_bin);

        let mut child = Command::new(&self.curl_bin)
          .arg("-s")
          .arg("-S")
          .arg("-X").arg("POST")
          .arg("-H").arg("Content-Type: application/json")
          .arg("-d").arg(body)
          .arg(url)
          .stdin(Stdio::null())
          .stdout(Stdio::piped())
          .stderr(Stdio::piped())
          .spawn()
          .map_err(|e| {
            error!("Failed to spawn {}: {}", self.curl_bin, e);
            crate::error::Error::SpawnFailed(e.to_string())
          })?;

        let stdout = child.stdout.take()
          .ok_or_else(|| {
            crate::error::Error::SpawnFailed(
              "child stdout not captured".to_string()
            )
          })?;
        let stderr = child.stderr.take()
          .ok_or_else(|| {
            crate::error::Error::SpawnFailed(
              "child stderr not captured".to_string()
            )
          })?;

        let (tx, rx)
          = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
          let out_pump = tokio::spawn(pump(
            stdout,
            tx.clone(),
            Stream::Stdout
          ));
          let err_pump = tokio::spawn(pump(
            stderr,
            tx.clone(),
            Stream::Stderr
          ));

          let status = child.wait().await;

          // Drain both pipes fully so Exit is the last event
          let _ = out_pump.await;
          let _ = err_pump.await;

          let code = match status
          {   Ok(s) => s.code().unwrap_or(-1)
            , Err(e) => {
                error!("Failed to reap curl: {}", e);
                -1
              }
          };
          trace!("curl exited with code {}", code);
          let _ = tx.send(
            crate::TransportOutcome::Exit(code)
          );
        });

        Ok(rx)
    }
}

impl Default for CurlTransport
{   fn default() -> Self
    {   CurlTransport::new()
    }
}

#[derive(Clone, Copy)]
enum Stream
{   Stdout
  , Stderr
}

/// Forward one pipe to the outcome channel, chunked at
/// newlines so a multibyte character is never split
async fn pump<R>(
  reader: R
, tx: super::OutcomeSender
, stream: Stream
)
where
  R: AsyncRead + Unpin
{   let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop
    {   buf.clear();
        match reader.read_until(b'\n', &mut buf).await
        {   Ok(0) => break
          , Ok(_) => {
              let text = String::from_utf8_lossy(&buf)
                .into_owned();
              let outcome = match stream
              {   Stream::Stdout => {
                    crate::TransportOutcome::StdoutChunk(text)
                  }
                , Stream::Stderr => {
                    crate::TransportOutcome::StderrChunk(text)
                  }
              };
              if tx.send(outcome).is_err()
              {   debug!("Outcome receiver dropped");
                  break;
              }
            }
          , Err(e) => {
              error!("Pipe read error: {}", e);
              break;
            }
        }
    }
}
