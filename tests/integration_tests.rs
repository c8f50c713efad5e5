use gemask::resolver::{
  resolve, Resolution, ResolvedResponse, ResponseResolver
};
use gemask::TransportOutcome;

fn init_logs()
{   let _ = env_logger::builder()
      .is_test(true)
      .try_init();
}

fn test_config() -> gemask::GemaskConfig
{   gemask::GemaskConfig::default()
      .with_credential("test-key".to_string())
}

// ===== Request Builder =====

#[test]
fn test_request_body_round_trips()
{   init_logs();
    let config = test_config();
    let question = "Why is the sky blue? \"Really\"?";

    let (_url, body) = gemask::request::build_request(
      &config,
      question
    ).expect("build_request should succeed");

    let decoded: serde_json::Value
      = serde_json::from_str(&body).unwrap();
    let expected = serde_json::json!({
      "contents": [
        { "parts": [ { "text": question } ] }
      ]
    });
    assert_eq!(decoded, expected);
}

#[test]
fn test_request_url_embeds_model_and_credential()
{   init_logs();
    let config = test_config()
      .with_model("gemini-1.5-pro".to_string());

    let (url, _body) = gemask::request::build_request(
      &config,
      "hello"
    ).unwrap();

    assert!(url.contains(
      "/v1beta/models/gemini-1.5-pro:generateContent"
    ));
    assert!(url.contains("key=test-key"));
}

#[test]
fn test_request_credential_is_query_encoded()
{   init_logs();
    let config = gemask::GemaskConfig::default()
      .with_credential("a&b=c".to_string());

    let (url, _body) = gemask::request::build_request(
      &config,
      "hello"
    ).unwrap();

    // Raw separators must not survive into the query value
    assert!(!url.contains("key=a&b=c"));
    assert!(url.contains("key=a%26b%3Dc"));
}

#[test]
fn test_missing_credential_fails_before_transport()
{   init_logs();
    let config = gemask::GemaskConfig::default();
    assert!(config.credential.is_none());

    let result = gemask::request::build_request(
      &config,
      "hello"
    );
    assert_eq!(
      result,
      Err(gemask::error::Error::MissingCredential)
    );
}

#[test]
fn test_empty_question_rejected_by_builder()
{   init_logs();
    let config = test_config();
    let result = gemask::request::build_request(
      &config,
      "   "
    );
    assert_eq!(
      result,
      Err(gemask::error::Error::EmptyQuestion)
    );
}

// ===== Response Resolver =====

#[test]
fn test_resolves_answer_from_stdout()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#
        .to_string()
    ));
    resolver.observe(TransportOutcome::Exit(0));

    let resolution = resolver.finish();
    assert_eq!(
      resolution.response,
      ResolvedResponse::Answer("hello".to_string())
    );
    assert_eq!(resolution.late_exit, None);
}

#[test]
fn test_resolves_api_error_despite_stderr_noise()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    // Transports may write diagnostics even on success
    resolver.observe(TransportOutcome::StderrChunk(
      "  % Total    % Received\n".to_string()
    ));
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"error":{"message":"quota exceeded"}}"#.to_string()
    ));
    resolver.observe(TransportOutcome::Exit(0));

    match resolver.finish().response
    {   ResolvedResponse::ApiError { message, raw_body } => {
          assert_eq!(message, "quota exceeded");
          assert!(raw_body.contains("quota exceeded"));
        }
      , other => panic!("Expected ApiError, got {:?}", other)
    }
}

#[test]
fn test_resolves_transport_error_from_stderr()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StderrChunk(
      "curl: (6) could not resolve host\n".to_string()
    ));
    resolver.observe(TransportOutcome::Exit(6));

    assert_eq!(
      resolver.finish().response,
      ResolvedResponse::TransportError(
        "curl: (6) could not resolve host".to_string()
      )
    );
}

#[test]
fn test_resolves_malformed_from_non_json_stdout()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StdoutChunk(
      "not json".to_string()
    ));
    resolver.observe(TransportOutcome::Exit(0));

    assert_eq!(
      resolver.finish().response,
      ResolvedResponse::MalformedResponse(
        "not json".to_string()
      )
    );
}

#[test]
fn test_resolves_malformed_from_unexpected_shape()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"unexpected":true}"#.to_string()
    ));
    resolver.observe(TransportOutcome::Exit(0));

    match resolver.finish().response
    {   ResolvedResponse::MalformedResponse(raw) => {
          assert!(raw.contains("unexpected"));
        }
      , other => panic!(
          "Expected MalformedResponse, got {:?}", other
        )
    }
}

#[test]
fn test_resolves_empty_response_edge_case()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::Exit(0));

    let resolution = resolver.finish();
    assert_eq!(
      resolution.response,
      ResolvedResponse::MalformedResponse("".to_string())
    );
    assert_eq!(
      resolution.render(),
      "**Empty response from the API**"
    );
}

#[test]
fn test_resolves_process_failure_with_no_other_signal()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::Exit(22));

    assert_eq!(
      resolver.finish().response,
      ResolvedResponse::ProcessFailure(22)
    );
}

#[test]
fn test_stdout_chunks_coalesce_before_decode()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    // Chunk boundaries carry no semantic meaning
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"candidates":[{"content":"#.to_string()
    ));
    assert!(!resolver.is_resolved());
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"parts":[{"text":"split"}]}}]}"#.to_string()
    ));
    assert!(resolver.is_resolved());
    resolver.observe(TransportOutcome::Exit(0));

    assert_eq!(
      resolver.finish().response,
      ResolvedResponse::Answer("split".to_string())
    );
}

#[test]
fn test_latch_ignores_outcomes_after_resolution()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"candidates":[{"content":{"parts":[{"text":"first"}]}}]}"#
        .to_string()
    ));
    assert!(resolver.is_resolved());

    // A late stderr chunk must not change the result
    resolver.observe(TransportOutcome::StderrChunk(
      "late diagnostic noise".to_string()
    ));
    resolver.observe(TransportOutcome::Exit(0));

    let resolution = resolver.finish();
    assert_eq!(
      resolution.response,
      ResolvedResponse::Answer("first".to_string())
    );
    assert_eq!(resolution.late_exit, None);
}

#[test]
fn test_late_nonzero_exit_annotates_without_replacing()
{   init_logs();
    let mut resolver = ResponseResolver::new();
    resolver.observe(TransportOutcome::StdoutChunk(
      r#"{"candidates":[{"content":{"parts":[{"text":"kept"}]}}]}"#
        .to_string()
    ));
    resolver.observe(TransportOutcome::Exit(3));

    let resolution = resolver.finish();
    assert_eq!(
      resolution.response,
      ResolvedResponse::Answer("kept".to_string())
    );
    assert_eq!(resolution.late_exit, Some(3));

    let rendered = resolution.render();
    assert!(rendered.starts_with("kept"));
    assert!(rendered.contains("exited with code 3"));
}

#[tokio::test]
async fn test_resolve_drives_outcome_stream()
{   init_logs();
    let (tx, rx)
      = tokio::sync::mpsc::unbounded_channel();
    tx.send(TransportOutcome::StdoutChunk(
      r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#
        .to_string()
    )).unwrap();
    tx.send(TransportOutcome::Exit(0)).unwrap();

    let resolution = resolve(rx, None).await;
    assert_eq!(
      resolution.response,
      ResolvedResponse::Answer("hi".to_string())
    );
}

#[tokio::test]
async fn test_resolve_times_out_when_stream_stalls()
{   init_logs();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel
      ::<TransportOutcome>();

    let window
      = Some(std::time::Duration::from_millis(50));
    let resolution = resolve(rx, window).await;

    assert_eq!(
      resolution.response,
      ResolvedResponse::ProcessFailure(124)
    );
    drop(tx);
}

// ===== Command Table =====

#[test]
fn test_command_table_rejects_invalid_pairs_individually()
{   init_logs();
    let specs = vec![
      gemask::CommandSpec
      {   command_name: "Summarize".to_string()
        , prompt_text: "Summarize the following:".to_string()
      }
    , gemask::CommandSpec
      {   command_name: "".to_string()
        , prompt_text: "orphaned prompt".to_string()
      }
    , gemask::CommandSpec
      {   command_name: "Broken".to_string()
        , prompt_text: "  ".to_string()
      }
    ];

    let table = gemask::CommandTable::register(specs);
    assert_eq!(table.len(), 1);
    assert_eq!(
      table.prompt_for("Summarize"),
      Some("Summarize the following:")
    );
    assert_eq!(table.prompt_for("Broken"), None);
}

// ===== Configuration =====

#[test]
fn test_config_reads_credential_from_env()
{   init_logs();
    std::env::set_var(
      gemask::config::CREDENTIAL_ENV_VAR,
      "env-key"
    );
    let config = gemask::GemaskConfig::from_env();
    assert_eq!(config.credential, Some("env-key".to_string()));

    let overridden
      = config.with_credential("explicit-key".to_string());
    assert_eq!(
      overridden.credential,
      Some("explicit-key".to_string())
    );
    std::env::remove_var(
      gemask::config::CREDENTIAL_ENV_VAR
    );
}

// ===== Backend =====

#[tokio::test]
async fn test_backend_initialization()
{   init_logs();
    let backend = gemask::GemaskBackend::new(
      gemask::GemaskConfig::default(),
      vec![]
    );
    println!("Backend created successfully");

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_rejects_empty_question()
{   init_logs();
    let backend = gemask::GemaskBackend::new(
      test_config(),
      vec![]
    );

    let mut rx = backend
      .ask("   ".to_string())
      .await
      .unwrap();
    let reply = rx.recv().await.unwrap();
    assert_eq!(
      reply,
      Err(gemask::error::Error::EmptyQuestion)
    );

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_reports_missing_credential()
{   init_logs();
    // No credential: the reply must arrive without any
    // transport activity
    let backend = gemask::GemaskBackend::new(
      gemask::GemaskConfig::default(),
      vec![]
    );

    let mut rx = backend
      .ask("What is 2+2?".to_string())
      .await
      .unwrap();
    let reply = rx.recv().await.unwrap();
    assert_eq!(
      reply,
      Err(gemask::error::Error::MissingCredential)
    );

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_rejects_unknown_command()
{   init_logs();
    let backend = gemask::GemaskBackend::new(
      test_config(),
      vec![]
    );

    let mut rx = backend
      .ask_selection(
        "NoSuchCommand".to_string(),
        vec!["some line".to_string()]
      )
      .await
      .unwrap();
    let reply = rx.recv().await.unwrap();
    assert_eq!(
      reply,
      Err(gemask::error::Error::UnknownCommand(
        "NoSuchCommand".to_string()
      ))
    );

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_backend_rejects_empty_selection()
{   init_logs();
    let specs = vec![
      gemask::CommandSpec
      {   command_name: "Explain".to_string()
        , prompt_text: "Explain this:".to_string()
      }
    ];
    let backend = gemask::GemaskBackend::new(
      test_config(),
      specs
    );

    let mut rx = backend
      .ask_selection(
        "Explain".to_string(),
        vec!["".to_string(), "   ".to_string()]
      )
      .await
      .unwrap();
    let reply = rx.recv().await.unwrap();
    assert_eq!(
      reply,
      Err(gemask::error::Error::EmptySelection(
        "Explain".to_string()
      ))
    );

    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_ask_into_renders_errors_as_text()
{   init_logs();
    let backend = gemask::GemaskBackend::new(
      gemask::GemaskConfig::default(),
      vec![]
    );
    let mut surface = gemask::BufferSurface::create();

    backend
      .ask_into(&mut surface, "hello".to_string())
      .await
      .expect("errors should render, not propagate");

    let content = surface.content().unwrap();
    assert!(content.contains("No API credential"));
    surface.destroy();

    let _ = backend.shutdown().await;
}

#[test]
fn test_resolution_render_is_markdown_text()
{   init_logs();
    let resolution = Resolution
    {   response: ResolvedResponse::ApiError
        {   message: "quota exceeded".to_string()
          , raw_body:
              r#"{"error":{"message":"quota exceeded"}}"#
                .to_string()
        }
      , late_exit: None
    };

    let rendered = resolution.render();
    assert!(rendered.contains("**API error:** quota exceeded"));
    assert!(rendered.contains("```"));
}

#[tokio::test]
#[ignore]
async fn test_live_ask_round_trip()
{   init_logs();
    let config = gemask::GemaskConfig::from_env();
    if config.credential.is_none()
    {   println!("Skipping: GEMINI_API_KEY not set");
        return;
    }

    let backend = gemask::GemaskBackend::new(config, vec![]);

    let reply_rx = backend
      .ask("What is 2+2?".to_string())
      .await;
    assert!(reply_rx.is_ok());

    let mut rx = reply_rx.unwrap();
    match tokio::time::timeout(
      std::time::Duration::from_secs(15),
      rx.recv()
    ).await
    {   Ok(Some(result)) => {
          match result
          {   Ok(resolution) => {
                println!("Rendered: {}", resolution.render());
              }
            , Err(e) => {
                println!("Pipeline error: {}", e);
              }
          }
        }
      , Ok(None) => {
          println!("Channel closed");
        }
      , Err(_) => {
          println!("Timeout waiting for response");
        }
    }

    let _ = backend.shutdown().await;
}
