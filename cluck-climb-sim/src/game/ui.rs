//! UI Model
//!
//! What the per-slot panels and the countdown overlay should show. The
//! match state drives it; the host only renders it.

use serde::{Serialize, Deserialize};

use crate::game::countdown::CountdownStage;
use crate::MAX_PLAYERS;

/// Panel state for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerUiState {
    /// Empty slot, press to join
    WaitJoin,
    /// Joined, not ready
    Joined,
    /// Ready
    Ready,
    /// Playing
    InGame,
    /// Eliminated this round
    Dead,
    /// Slot sits this match out
    NotPlayer,
    /// Showing rounds won after a round
    Round,
    /// Showing the final rank
    Results,
}

/// Final placing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(pub u8);

impl Rank {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "FIRST",
            2 => "SECOND",
            3 => "THIRD",
            _ => "FOURTH",
        }
    }
}

/// Rank for each scored slot: one plus the number of strictly higher scores.
///
/// Empty slots get no rank and do not count. Ties share a rank.
pub fn assigned_ranks(scores: &[Option<u8>; MAX_PLAYERS]) -> [Option<Rank>; MAX_PLAYERS] {
    let mut ranks = [None; MAX_PLAYERS];
    for (i, score) in scores.iter().enumerate() {
        if let Some(score) = score {
            let higher = scores.iter().flatten().filter(|other| *other > score).count();
            ranks[i] = Some(Rank(1 + higher as u8));
        }
    }
    ranks
}

/// One slot panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPanel {
    /// What the panel shows
    pub state: PlayerUiState,
    /// Rounds won, shown in Round and Results
    pub rounds_won: u8,
    /// Final rank, shown in Results
    pub rank: Option<Rank>,
}

impl Default for SlotPanel {
    fn default() -> Self {
        Self {
            state: PlayerUiState::WaitJoin,
            rounds_won: 0,
            rank: None,
        }
    }
}

/// Whole-screen UI model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchUi {
    /// Panel per slot
    pub panels: [SlotPanel; MAX_PLAYERS],
    /// Countdown overlay text
    pub countdown_text: Option<String>,
    /// Lobby dimming layer
    pub dim_background: bool,
}

impl Default for MatchUi {
    fn default() -> Self {
        Self {
            panels: [SlotPanel::default(); MAX_PLAYERS],
            countdown_text: None,
            dim_background: true,
        }
    }
}

impl MatchUi {
    /// Panel of a slot.
    pub fn panel(&self, slot: usize) -> &SlotPanel {
        &self.panels[slot]
    }

    /// Set one panel's state.
    pub fn set_state(&mut self, slot: usize, state: PlayerUiState) {
        if let Some(panel) = self.panels.get_mut(slot) {
            panel.state = state;
        }
    }

    /// Occupied slots show Joined (keeping Ready), empty ones WaitJoin.
    pub fn update_joined(&mut self, occupied: [bool; MAX_PLAYERS]) {
        for (panel, joined) in self.panels.iter_mut().zip(occupied) {
            if !joined {
                *panel = SlotPanel::default();
            } else if panel.state == PlayerUiState::WaitJoin {
                panel.state = PlayerUiState::Joined;
            }
        }
    }

    /// Back to the lobby: occupied slots Joined with no scores.
    pub fn reset_joined(&mut self, occupied: [bool; MAX_PLAYERS]) {
        for (panel, joined) in self.panels.iter_mut().zip(occupied) {
            *panel = SlotPanel {
                state: if joined { PlayerUiState::Joined } else { PlayerUiState::WaitJoin },
                ..SlotPanel::default()
            };
        }
        self.countdown_text = None;
        self.dim_background = true;
    }

    /// Ready toggle.
    pub fn set_ready(&mut self, slot: usize, ready: bool) {
        self.set_state(slot, if ready { PlayerUiState::Ready } else { PlayerUiState::Joined });
    }

    /// Round start: participants InGame, everyone else NotPlayer.
    pub fn on_game_started(&mut self, participants: [bool; MAX_PLAYERS]) {
        for (panel, playing) in self.panels.iter_mut().zip(participants) {
            panel.state = if playing { PlayerUiState::InGame } else { PlayerUiState::NotPlayer };
        }
    }

    /// Show rounds won for every participant.
    pub fn on_win_round(&mut self, rounds: &[Option<u8>; MAX_PLAYERS]) {
        for (panel, won) in self.panels.iter_mut().zip(rounds) {
            if let Some(won) = won {
                panel.rounds_won = *won;
                panel.state = PlayerUiState::Round;
            }
        }
    }

    /// Show final ranks for every participant.
    pub fn on_match_won(&mut self, rounds: &[Option<u8>; MAX_PLAYERS]) {
        let ranks = assigned_ranks(rounds);
        for (panel, rank) in self.panels.iter_mut().zip(ranks) {
            if rank.is_some() {
                panel.rank = rank;
                panel.state = PlayerUiState::Results;
            }
        }
    }

    /// Countdown moved to a new stage.
    pub fn on_countdown(&mut self, stage: CountdownStage) {
        if stage == CountdownStage::Ready {
            self.dim_background = false;
        }
        self.countdown_text = stage.text().map(str::to_string);
    }

    /// Countdown cancelled.
    pub fn on_countdown_stopped(&mut self) {
        self.countdown_text = None;
        self.dim_background = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_share_ties() {
        let ranks = assigned_ranks(&[Some(3), Some(1), Some(3), None]);
        assert_eq!(ranks, [Some(Rank(1)), Some(Rank(3)), Some(Rank(1)), None]);
        assert_eq!(Rank(1).label(), "FIRST");
        assert_eq!(Rank(3).label(), "THIRD");
    }

    #[test]
    fn test_ranks_all_distinct() {
        let ranks = assigned_ranks(&[Some(0), Some(2), Some(3), Some(1)]);
        let labels: Vec<_> = ranks.iter().map(|r| r.map(Rank::label)).collect();
        assert_eq!(
            labels,
            vec![Some("FOURTH"), Some("SECOND"), Some("FIRST"), Some("THIRD")]
        );
    }

    #[test]
    fn test_lobby_flow() {
        let mut ui = MatchUi::default();
        ui.update_joined([true, false, true, false]);
        assert_eq!(ui.panel(0).state, PlayerUiState::Joined);
        assert_eq!(ui.panel(1).state, PlayerUiState::WaitJoin);

        ui.set_ready(0, true);
        ui.update_joined([true, false, true, true]);
        assert_eq!(ui.panel(0).state, PlayerUiState::Ready);
        assert_eq!(ui.panel(3).state, PlayerUiState::Joined);

        ui.on_game_started([true, false, true, true]);
        assert_eq!(ui.panel(1).state, PlayerUiState::NotPlayer);
        assert_eq!(ui.panel(2).state, PlayerUiState::InGame);
    }

    #[test]
    fn test_round_and_results() {
        let mut ui = MatchUi::default();
        let rounds = [Some(3), Some(1), None, None];
        ui.on_win_round(&rounds);
        assert_eq!(ui.panel(0).state, PlayerUiState::Round);
        assert_eq!(ui.panel(0).rounds_won, 3);
        assert_eq!(ui.panel(2).state, PlayerUiState::WaitJoin);

        ui.on_match_won(&rounds);
        assert_eq!(ui.panel(0).state, PlayerUiState::Results);
        assert_eq!(ui.panel(0).rank, Some(Rank(1)));
        assert_eq!(ui.panel(1).rank, Some(Rank(2)));
        assert!(ui.panel(2).rank.is_none());
    }

    #[test]
    fn test_countdown_overlay() {
        let mut ui = MatchUi::default();
        ui.on_countdown(CountdownStage::Ready);
        assert_eq!(ui.countdown_text.as_deref(), Some("Ready..."));
        assert!(!ui.dim_background);

        ui.on_countdown_stopped();
        assert!(ui.countdown_text.is_none());
        assert!(ui.dim_background);
    }
}
