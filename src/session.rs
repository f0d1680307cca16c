//! Turn-taking state for one dialog session: whose turn it is, the round
//! counter, the pause flag, and the accumulated conversation history. All
//! mutation goes through the operations here; the driver owns the single
//! session instance, so there is no hidden shared state.

use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::stream::normalize_content;

/// Message sent on the very first turn, when nobody has spoken.
pub const OPENING_PROMPT: &str = "Say something to get the conversation going.";

/// Message sent when history exists but the counterpart never spoke.
pub const NO_REPLY_PROMPT: &str = "Your counterpart has not spoken yet. Please begin.";

/// One completed turn, as stored and as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Where the dialog stands. `RoundsExhausted` is presented to the user
/// exactly like `Paused`: both are resumable with a continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    RoundsExhausted,
}

/// Settings sampled from the live user inputs at each turn start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSettings {
    pub max_rounds: u32,
    pub world_setting: String,
}

/// What the completion handler decided after a turn's stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Chain into the next turn for this role.
    Next(Role),
    Paused,
    RoundsExhausted,
}

#[derive(Debug)]
pub struct DialogSession {
    history: Vec<HistoryEntry>,
    round: u32,
    max_rounds: u32,
    last_speaker: Option<Role>,
    paused: bool,
    world_setting: String,
    phase: Phase,
}

impl Default for DialogSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogSession {
    pub fn new() -> Self {
        DialogSession {
            history: Vec::new(),
            round: 0,
            max_rounds: 0,
            last_speaker: None,
            paused: false,
            world_setting: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn last_speaker(&self) -> Option<Role> {
        self.last_speaker
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn world_setting(&self) -> &str {
        &self.world_setting
    }

    /// Re-sample the round limit and world setting. Called at every turn
    /// start so live user edits take effect on the next request.
    pub fn refresh_settings(&mut self, settings: TurnSettings) {
        self.max_rounds = settings.max_rounds;
        self.world_setting = settings.world_setting;
    }

    /// Begin a new dialog: round and history reset regardless of prior
    /// state. The first turn always goes to the left role.
    pub fn start(&mut self) -> Role {
        self.round = 0;
        self.history.clear();
        self.last_speaker = None;
        self.paused = false;
        self.phase = Phase::Running;
        Role::AiLeft
    }

    /// Resume after a pause or an exhausted round limit. Round counter and
    /// history are preserved; the next turn goes to the role opposite the
    /// last recorded speaker.
    pub fn resume(&mut self) -> Role {
        self.paused = false;
        self.phase = Phase::Running;
        self.last_speaker
            .map(|speaker| speaker.opposite())
            .unwrap_or(Role::AiLeft)
    }

    /// Request a pause. The in-flight stream is never interrupted; the flag
    /// is honored by the completion handler once the current turn ends.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// The outgoing message for `speaker`: the most recent history entry not
    /// authored by the speaking role, or a fallback placeholder.
    pub fn select_message(&self, speaker: Role) -> String {
        if self.history.is_empty() {
            return OPENING_PROMPT.to_string();
        }
        self.history
            .iter()
            .rev()
            .find(|entry| entry.role != speaker)
            .map(|entry| entry.content.clone())
            .unwrap_or_else(|| NO_REPLY_PROMPT.to_string())
    }

    /// The last `limit` history entries, for the request payload. A limit of
    /// zero sends an empty history.
    pub fn truncated_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..].to_vec()
    }

    /// Record a completed turn and decide what happens next. The history
    /// entry lands before the pause flag is consulted, so a pause request
    /// never leaves a turn half-recorded.
    pub fn complete_turn(&mut self, speaker: Role, full_text: &str) -> TurnOutcome {
        self.history.push(HistoryEntry {
            role: speaker,
            content: normalize_content(full_text),
        });
        self.last_speaker = Some(speaker);
        self.round += 1;

        if self.paused {
            self.phase = Phase::Paused;
            return TurnOutcome::Paused;
        }
        if self.round >= self.max_rounds {
            self.phase = Phase::RoundsExhausted;
            return TurnOutcome::RoundsExhausted;
        }
        TurnOutcome::Next(speaker.opposite())
    }

    /// A turn that errored records nothing: no history entry, speaker
    /// unchanged, and the dialog halts in a resumable state. A continue
    /// therefore retries the same role.
    pub fn fail_turn(&mut self) {
        self.paused = true;
        self.phase = Phase::Paused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_session(max_rounds: u32) -> DialogSession {
        let mut session = DialogSession::new();
        session.refresh_settings(TurnSettings {
            max_rounds,
            world_setting: String::new(),
        });
        session.start();
        session
    }

    // -- start --------------------------------------------------------------

    #[test]
    fn test_new_session_is_idle() {
        let session = DialogSession::new();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.history().is_empty());
        assert_eq!(session.round(), 0);
        assert!(session.last_speaker().is_none());
    }

    #[test]
    fn test_start_first_turn_is_left() {
        let mut session = running_session(4);
        assert_eq!(session.start(), Role::AiLeft);
    }

    #[test]
    fn test_start_resets_regardless_of_prior_state() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "hello");
        session.complete_turn(Role::AiRight, "hi back");
        session.pause();

        session.start();
        assert_eq!(session.round(), 0);
        assert!(session.history().is_empty());
        assert!(session.last_speaker().is_none());
        assert!(!session.is_paused());
        assert_eq!(session.phase(), Phase::Running);
    }

    // -- settings sampling --------------------------------------------------

    #[test]
    fn test_refresh_settings_updates_limit_and_world() {
        let mut session = DialogSession::new();
        session.refresh_settings(TurnSettings {
            max_rounds: 7,
            world_setting: "medieval tavern".to_string(),
        });
        assert_eq!(session.max_rounds(), 7);
        assert_eq!(session.world_setting(), "medieval tavern");
    }

    #[test]
    fn test_refresh_settings_mid_dialog_takes_effect() {
        let mut session = running_session(2);
        session.complete_turn(Role::AiLeft, "one");
        // User raised the limit while the turn streamed.
        session.refresh_settings(TurnSettings {
            max_rounds: 5,
            world_setting: String::new(),
        });
        let outcome = session.complete_turn(Role::AiRight, "two");
        assert_eq!(outcome, TurnOutcome::Next(Role::AiLeft));
    }

    // -- message selection --------------------------------------------------

    #[test]
    fn test_select_message_empty_history_uses_opening_prompt() {
        let session = running_session(4);
        assert_eq!(session.select_message(Role::AiLeft), OPENING_PROMPT);
    }

    #[test]
    fn test_select_message_picks_latest_opponent_entry() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "first left");
        session.complete_turn(Role::AiRight, "first right");
        session.complete_turn(Role::AiLeft, "second left");
        assert_eq!(session.select_message(Role::AiRight), "second left");
        assert_eq!(session.select_message(Role::AiLeft), "first right");
    }

    #[test]
    fn test_select_message_opponent_never_spoke() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "talking to myself");
        assert_eq!(session.select_message(Role::AiLeft), NO_REPLY_PROMPT);
    }

    // -- history ------------------------------------------------------------

    #[test]
    fn test_complete_turn_normalizes_content() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "  hello\nthere   world\t");
        assert_eq!(session.history()[0].content, "hello there world");
    }

    #[test]
    fn test_history_never_contains_newlines_or_double_spaces() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "a\n\nb  c");
        session.complete_turn(Role::AiRight, "d\te \n f");
        for entry in session.history() {
            assert!(!entry.content.contains('\n'));
            assert!(!entry.content.contains("  "));
        }
    }

    #[test]
    fn test_truncated_history_respects_limit() {
        let mut session = running_session(100);
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::AiLeft } else { Role::AiRight };
            session.complete_turn(role, &format!("turn {}", i));
        }
        assert_eq!(session.truncated_history(2).len(), 2);
        assert_eq!(session.truncated_history(2)[0].content, "turn 3");
        assert_eq!(session.truncated_history(2)[1].content, "turn 4");
    }

    #[test]
    fn test_truncated_history_zero_limit_is_empty() {
        let mut session = running_session(100);
        session.complete_turn(Role::AiLeft, "hello");
        assert!(session.truncated_history(0).is_empty());
    }

    #[test]
    fn test_truncated_history_limit_above_length() {
        let mut session = running_session(100);
        session.complete_turn(Role::AiLeft, "hello");
        assert_eq!(session.truncated_history(50).len(), 1);
    }

    // -- turn completion ----------------------------------------------------

    #[test]
    fn test_complete_turn_alternates_roles() {
        let mut session = running_session(10);
        assert_eq!(
            session.complete_turn(Role::AiLeft, "hi"),
            TurnOutcome::Next(Role::AiRight)
        );
        assert_eq!(
            session.complete_turn(Role::AiRight, "hello"),
            TurnOutcome::Next(Role::AiLeft)
        );
    }

    #[test]
    fn test_complete_turn_increments_round() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "hi");
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn test_rounds_exhausted_after_limit() {
        let mut session = running_session(2);
        assert_eq!(
            session.complete_turn(Role::AiLeft, "one"),
            TurnOutcome::Next(Role::AiRight)
        );
        assert_eq!(
            session.complete_turn(Role::AiRight, "two"),
            TurnOutcome::RoundsExhausted
        );
        assert_eq!(session.phase(), Phase::RoundsExhausted);
    }

    #[test]
    fn test_pause_takes_precedence_over_exhaustion() {
        let mut session = running_session(1);
        session.pause();
        assert_eq!(
            session.complete_turn(Role::AiLeft, "only"),
            TurnOutcome::Paused
        );
        assert_eq!(session.phase(), Phase::Paused);
    }

    #[test]
    fn test_pause_still_records_the_turn() {
        let mut session = running_session(10);
        session.pause();
        session.complete_turn(Role::AiLeft, "recorded anyway");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.round(), 1);
        assert_eq!(session.last_speaker(), Some(Role::AiLeft));
    }

    // -- resume -------------------------------------------------------------

    #[test]
    fn test_resume_preserves_round_and_history() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "one");
        session.pause();
        session.complete_turn(Role::AiRight, "two");

        session.resume();
        assert_eq!(session.round(), 2);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_resume_selects_role_opposite_last_speaker() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "one");
        session.pause();
        session.complete_turn(Role::AiRight, "two");
        assert_eq!(session.resume(), Role::AiLeft);
    }

    #[test]
    fn test_resume_with_no_speaker_defaults_to_left() {
        let mut session = DialogSession::new();
        assert_eq!(session.resume(), Role::AiLeft);
    }

    #[test]
    fn test_resume_clears_pause_flag() {
        let mut session = running_session(10);
        session.pause();
        session.resume();
        assert!(!session.is_paused());
        assert_eq!(session.phase(), Phase::Running);
    }

    // -- failure ------------------------------------------------------------

    #[test]
    fn test_fail_turn_records_nothing() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "one");
        session.fail_turn();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.round(), 1);
        assert_eq!(session.last_speaker(), Some(Role::AiLeft));
        assert_eq!(session.phase(), Phase::Paused);
    }

    #[test]
    fn test_continue_after_failure_retries_same_role() {
        let mut session = running_session(10);
        session.complete_turn(Role::AiLeft, "one");
        // AiRight's turn failed: nothing recorded, so resume opposes AiLeft.
        session.fail_turn();
        assert_eq!(session.resume(), Role::AiRight);
    }
}
