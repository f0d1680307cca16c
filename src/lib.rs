pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod render;
pub mod role;
pub mod session;
pub mod stream;

use std::sync::{Arc, Mutex};

use tokio_stream::StreamExt;
use tracing::{debug, warn};

use client::{ChatClient, TurnRequest};
use config::{ChatConfig, RoleModels};
use error::ChatError;
use render::{Renderer, ThinkingIndicator};
use role::Role;
use session::{DialogSession, TurnOutcome, TurnSettings};
use stream::EventParser;

// ---------------------------------------------------------------------------
// Live control inputs
// ---------------------------------------------------------------------------

/// User inputs shared between the command loop and the dialog driver. The
/// driver samples the round limit and world setting at each turn start and
/// the pause flag after each turn completes; nothing is subscribed
/// continuously.
#[derive(Debug, Clone, Default)]
pub struct ControlInputs {
    pub pause_requested: bool,
    /// Live round-limit input; `None` falls back to the server default.
    pub rounds_input: Option<u32>,
    pub world_setting: String,
}

pub type SharedControls = Arc<Mutex<ControlInputs>>;

pub fn new_controls() -> SharedControls {
    Arc::new(Mutex::new(ControlInputs::default()))
}

/// Settings a turn runs under, resolved from the live inputs.
pub fn effective_settings(inputs: &ControlInputs, default_rounds: u32) -> TurnSettings {
    TurnSettings {
        max_rounds: inputs.rounds_input.unwrap_or(default_rounds),
        world_setting: inputs.world_setting.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// DialogDriver: the turn loop
// ---------------------------------------------------------------------------

/// Why a dialog run returned control to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Paused,
    RoundsExhausted,
    Failed,
}

/// Owns the session, client, and renderer, and drives turns sequentially on
/// one task, which is what keeps at most one chat request in flight.
pub struct DialogDriver<R: Renderer> {
    client: ChatClient,
    config: ChatConfig,
    roles: RoleModels,
    pub session: DialogSession,
    pub renderer: R,
    controls: SharedControls,
}

impl<R: Renderer> DialogDriver<R> {
    pub fn new(
        client: ChatClient,
        config: ChatConfig,
        roles: RoleModels,
        renderer: R,
        controls: SharedControls,
    ) -> Self {
        DialogDriver {
            client,
            config,
            roles,
            session: DialogSession::new(),
            renderer,
            controls,
        }
    }

    fn sample_settings(&self) -> TurnSettings {
        let inputs = self.controls.lock().unwrap_or_else(|e| e.into_inner());
        effective_settings(&inputs, self.config.default_rounds)
    }

    fn pause_was_requested(&self) -> bool {
        self.controls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pause_requested
    }

    /// Run turns until the dialog pauses, exhausts its rounds, or fails.
    /// `resume` continues a halted dialog instead of starting fresh.
    pub async fn run_dialog(&mut self, resume: bool) -> Halt {
        let mut speaker = if resume {
            self.session.resume()
        } else {
            self.session.start()
        };

        loop {
            match self.run_turn(speaker).await {
                Ok(TurnOutcome::Next(next)) => speaker = next,
                Ok(TurnOutcome::Paused) => return Halt::Paused,
                Ok(TurnOutcome::RoundsExhausted) => return Halt::RoundsExhausted,
                Err(err) => {
                    warn!("turn for {} failed: {}", speaker, err);
                    return Halt::Failed;
                }
            }
        }
    }

    /// One complete request/stream/response cycle for `speaker`.
    pub async fn run_turn(&mut self, speaker: Role) -> Result<TurnOutcome, ChatError> {
        // Pick up live edits to the round limit and world setting.
        self.session.refresh_settings(self.sample_settings());

        let model = self.roles.model_for(speaker).to_string();
        let request = TurnRequest {
            history: self.session.truncated_history(self.config.history_length),
            message: self.session.select_message(speaker),
            temperature: self.config.temperature,
            model: model.clone(),
            role: speaker,
            world_setting: self.session.world_setting().to_string(),
        };
        debug!(role = %speaker, model = %model, round = self.session.round(), "starting turn");

        self.renderer.append_message(speaker, "thinking...");
        let indicator = self
            .renderer
            .animates_thinking()
            .then(ThinkingIndicator::start);

        let response = match self.client.send_turn(&request).await {
            Ok(response) => response,
            Err(err) => {
                drop(indicator);
                self.renderer.replace_text(&err.inline_message(&model));
                self.renderer.end_message();
                self.session.fail_turn();
                return Err(err);
            }
        };
        drop(indicator);
        self.renderer.replace_text("");

        let mut parser = EventParser::new();
        let mut full_text = String::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for fragment in parser.push(&bytes) {
                        self.renderer.append_text(&fragment);
                        full_text.push_str(&fragment);
                    }
                }
                Err(err) => {
                    let err = ChatError::from(err);
                    self.renderer.replace_text(&err.inline_message(&model));
                    self.renderer.end_message();
                    self.session.fail_turn();
                    return Err(err);
                }
            }
        }
        for fragment in parser.finish() {
            self.renderer.append_text(&fragment);
            full_text.push_str(&fragment);
        }
        self.renderer.end_message();

        if self.pause_was_requested() {
            self.session.pause();
        }
        Ok(self.session.complete_turn(speaker, &full_text))
    }
}
