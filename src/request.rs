//! Gemini wire types and the request builder

use serde::{Deserialize, Serialize};
use log::{debug, error, trace};

const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
}

impl GenerateContentRequest
{   /// Wrap a question in the nested generateContent shape
    pub fn from_question(question: &str) -> Self
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   parts: vec![
                    Part
                    {   text: question.to_string()
                    }
                  ]
              }
            ]
        }
    }
}

// ===== Request Builder =====

/// Build the destination URL and serialized body for a
/// question.
///
/// Fails before any transport activity when the credential is
/// absent, the question is blank, or the body cannot be
/// serialized. The body is later handed to the transport as a
/// single argument (never through a shell), so embedded quote
/// characters need no extra escaping here.
pub fn build_request(
  config: &crate::config::GemaskConfig
, question: &str
) -> Result<(String, String), crate::error::Error>
{   let credential = config.credential
      .as_deref()
      .filter(|k| !k.is_empty())
      .ok_or_else(|| {
        error!("No credential configured, refusing to build");
        crate::error::Error::MissingCredential
      })?;

    if question.trim().is_empty()
    {   error!("Empty question reached the request builder");
        return Err(crate::error::Error::EmptyQuestion);
    }

    let base = config.api_base
      .as_deref()
      .unwrap_or(GEMINI_API_BASE);

    let endpoint = format!(
      "{}/v1beta/models/{}:generateContent",
      base.trim_end_matches('/'),
      config.model
    );

    let mut url = reqwest::Url::parse(&endpoint)
      .map_err(|e| {
        error!("Bad endpoint URL: {}", e);
        crate::error::Error::InvalidConfiguration(
          e.to_string()
        )
      })?;
    url.query_pairs_mut().append_pair("key", credential);

    let request
      = GenerateContentRequest::from_question(question);
    let body = serde_json::to_string(&request)
      .map_err(|e| {
        error!("Failed to serialize request body: {}", e);
        crate::error::Error::EncodingError(e.to_string())
      })?;

    debug!(
      "Built request for model {} ({} body bytes)",
      config.model,
      body.len()
    );
    trace!("Request body: {}", body);

    Ok((url.into(), body))
}
