use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use log::{debug, error, info, warn};
use crate::GemaskFoot;

/// Backend state for routing ask commands
pub struct GemaskBackendState
{   pub config: crate::config::GemaskConfig
  , pub commands: crate::config::CommandTable
  , pub transport: Arc<crate::transport::Transport>
}

impl GemaskBackendState
{   /// Build the state from the setup-time configuration and
    /// prompt command specs
    pub fn new(
      config: crate::config::GemaskConfig
    , command_specs: Vec<crate::config::CommandSpec>
    ) -> Self
    {   debug!("Initializing GemaskBackendState");
        let commands
          = crate::config::CommandTable::register(
              command_specs
            );
        let transport = Arc::new(
          crate::transport::Transport::new(config.transport)
        );
        GemaskBackendState
        {   config
          , commands
          , transport
        }
    }
}

/// Public API for the gemask backend - owns the task
pub struct GemaskBackend
{   hand: crate::GemaskHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl GemaskBackend
{   /// Create and spawn a new gemask backend
    /// Returns immediately - spawns background task
    pub fn new(
      config: crate::config::GemaskConfig
    , command_specs: Vec<crate::config::CommandSpec>
    ) -> Self
    {   debug!("Creating GemaskBackend with task ownership");

        let (ask_tx, ask_rx)
          = mpsc::unbounded_channel();
        let (ask_selection_tx, ask_selection_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::GemaskHand
        {   ask_tx: ask_tx.clone()
          , ask_selection_tx: ask_selection_tx.clone()
          , kill_process_tx: kill_process_tx.clone()
        };

        let foot = crate::GemaskFoot
        {   ask_rx
          , ask_selection_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, config, command_specs).await
        });

        GemaskBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a free-form question - returns almost immediately
    pub async fn ask(
      &self
    , question: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::AskReply>,
        crate::error::Error
      >
    {   debug!("ask queuing question");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::AskArgs
        {   question
          , reply: reply_tx
        };

        self.hand.ask_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Disconnected
          })?;

        Ok(reply_rx)
    }

    /// Queue a fixed-prompt ask over selected lines.
    /// An empty command name selects the configured default
    /// prompt.
    pub async fn ask_selection(
      &self
    , command_name: String
    , lines: Vec<String>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::AskReply>,
        crate::error::Error
      >
    {   debug!(
          "ask_selection queuing command: {}",
          command_name
        );
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::AskSelectionArgs
        {   command_name
          , lines
          , reply: reply_tx
        };

        self.hand.ask_selection_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Disconnected
          })?;

        Ok(reply_rx)
    }

    /// Ask and render the outcome into a display surface.
    /// Every outcome, errors included, terminates as rendered
    /// text; nothing escapes as a fault.
    pub async fn ask_into<S>(
      &self
    , surface: &mut S
    , question: String
    ) -> Result<(), crate::error::Error>
    where
      S: crate::surface::DisplaySurface
    {   let mut reply_rx = self.ask(question).await?;
        let text = match reply_rx.recv().await
        {   Some(Ok(resolution)) => resolution.render()
          , Some(Err(e)) => format!("**{}**", e)
          , None => {
              error!("Reply channel closed without a reply");
              return Err(crate::error::Error::Disconnected);
            }
        };
        surface.render(&text)
    }

    /// Selection counterpart of ask_into
    pub async fn ask_selection_into<S>(
      &self
    , surface: &mut S
    , command_name: String
    , lines: Vec<String>
    ) -> Result<(), crate::error::Error>
    where
      S: crate::surface::DisplaySurface
    {   let mut reply_rx
          = self.ask_selection(command_name, lines).await?;
        let text = match reply_rx.recv().await
        {   Some(Ok(resolution)) => resolution.render()
          , Some(Err(e)) => format!("**{}**", e)
          , None => {
              error!("Reply channel closed without a reply");
              return Err(crate::error::Error::Disconnected);
            }
        };
        surface.render(&text)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down GemaskBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Disconnected
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Design: tokio::select! is ONLY for fast queueing. Each
/// accepted ask spawns its own pipeline task with its own
/// resolver, so one in-flight request never blocks the loop
/// and requests share no mutable state.
async fn run_backend_loop(
  foot: crate::GemaskFoot
, config: crate::config::GemaskConfig
, command_specs: Vec<crate::config::CommandSpec>
)
{   debug!("Starting GemaskBackend event loop");
    let state
      = GemaskBackendState::new(config, command_specs);
    let GemaskFoot
    {   mut ask_rx
      , mut ask_selection_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = ask_rx.recv() => {
          debug!("Received Ask");
          if cmd.question.trim().is_empty()
          {   warn!("Rejecting empty question");
              let _ = cmd.reply.send(
                Err(crate::error::Error::EmptyQuestion)
              );
              continue;
          }
          spawn_pipeline(&state, cmd.question, cmd.reply);
        }
      , Some(cmd) = ask_selection_rx.recv() => {
          debug!(
            "Received AskSelection for: {}",
            cmd.command_name
          );
          let prompt = if cmd.command_name.is_empty()
          {   state.config.default_prompt.clone()
          } else
          {   match state.commands
                .prompt_for(&cmd.command_name)
              {   Some(p) => p.to_string()
                , None => {
                    warn!(
                      "Unknown prompt command: {}",
                      cmd.command_name
                    );
                    let _ = cmd.reply.send(
                      Err(crate::error::Error::UnknownCommand(
                        cmd.command_name
                      ))
                    );
                    continue;
                  }
              }
          };

          let selected = cmd.lines.join("\n");
          if selected.trim().is_empty()
          {   // Must never reach the request builder
              warn!("Rejecting empty selection");
              let _ = cmd.reply.send(
                Err(crate::error::Error::EmptySelection(
                  cmd.command_name
                ))
              );
              continue;
          }

          let question
            = format!("{}\n\n{}", prompt, selected);
          spawn_pipeline(&state, question, cmd.reply);
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("GemaskBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}

/// Run one request end to end on its own task:
/// build -> dispatch -> resolve -> reply
fn spawn_pipeline(
  state: &GemaskBackendState
, question: String
, reply: crate::AskReplySender
)
{   let config = state.config.clone();
    let transport = Arc::clone(&state.transport);

    tokio::spawn(async move {
      let (url, body) = match crate::request::build_request(
        &config,
        &question
      )
      {   Ok(parts) => parts
        , Err(e) => {
            // Precondition failure: no transport activity
            let _ = reply.send(Err(e));
            return;
          }
      };

      let outcome_rx = match transport.dispatch(&url, &body)
      {   Ok(rx) => rx
        , Err(e) => {
            // Transport never started; report once as a
            // transport-class resolution
            error!("Dispatch failed: {}", e);
            let _ = reply.send(Ok(
              crate::resolver::Resolution
              {   response: crate::resolver::ResolvedResponse
                    ::TransportError(e.to_string())
                , late_exit: None
              }
            ));
            return;
          }
      };

      let window
        = config.timeout_secs.map(Duration::from_secs);
      let resolution
        = crate::resolver::resolve(outcome_rx, window).await;
      let _ = reply.send(Ok(resolution));
    });
}
