//! Round Countdown
//!
//! "Ready..." → "Steady..." → "GO!" → hidden. The round starts the moment
//! "GO!" shows; the text lingers briefly after. Cancelling is dropping the
//! countdown, so nothing fires late.

use serde::{Serialize, Deserialize};

use crate::config::MatchRules;

/// Countdown stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CountdownStage {
    /// First step
    Ready,
    /// Second step
    Steady,
    /// Round starts
    Go,
    /// Text hidden, countdown finished
    Hidden,
}

impl CountdownStage {
    /// On-screen text, if any.
    pub fn text(self) -> Option<&'static str> {
        match self {
            CountdownStage::Ready => Some("Ready..."),
            CountdownStage::Steady => Some("Steady..."),
            CountdownStage::Go => Some("GO!"),
            CountdownStage::Hidden => None,
        }
    }
}

/// Running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    /// Time since start (s)
    pub elapsed: f32,
    /// Current stage
    pub stage: CountdownStage,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    /// Start at "Ready...".
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            stage: CountdownStage::Ready,
        }
    }

    fn stage_at(&self, rules: &MatchRules) -> CountdownStage {
        let steady_at = rules.ready_step;
        let go_at = steady_at + rules.steady_step;
        let hide_at = go_at + rules.go_hold;

        if self.elapsed >= hide_at {
            CountdownStage::Hidden
        } else if self.elapsed >= go_at {
            CountdownStage::Go
        } else if self.elapsed >= steady_at {
            CountdownStage::Steady
        } else {
            CountdownStage::Ready
        }
    }

    /// Advance. Returns every stage entered during this step, in order.
    pub fn update(&mut self, rules: &MatchRules, dt: f32) -> Vec<CountdownStage> {
        self.elapsed += dt;
        let target = self.stage_at(rules);

        let mut entered = Vec::new();
        while self.stage < target {
            self.stage = match self.stage {
                CountdownStage::Ready => CountdownStage::Steady,
                CountdownStage::Steady => CountdownStage::Go,
                CountdownStage::Go | CountdownStage::Hidden => CountdownStage::Hidden,
            };
            entered.push(self.stage);
        }
        entered
    }

    /// Finished and hidden.
    pub fn is_done(&self) -> bool {
        self.stage == CountdownStage::Hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_stage_timing() {
        let rules = MatchRules::default();
        let mut countdown = Countdown::new();
        let mut log = Vec::new();

        for tick in 1..=400 {
            for stage in countdown.update(&rules, DT) {
                log.push((tick, stage));
            }
        }

        let ticks: Vec<_> = log.iter().map(|(t, _)| *t).collect();
        let stages: Vec<_> = log.iter().map(|(_, s)| *s).collect();
        assert_eq!(
            stages,
            vec![CountdownStage::Steady, CountdownStage::Go, CountdownStage::Hidden]
        );
        // 2 s, 4 s, 5 s at 60 Hz (within a tick of float drift)
        assert!((119..=121).contains(&ticks[0]));
        assert!((239..=241).contains(&ticks[1]));
        assert!((299..=301).contains(&ticks[2]));
        assert!(countdown.is_done());
    }

    #[test]
    fn test_large_step_enters_every_stage() {
        let rules = MatchRules::default();
        let mut countdown = Countdown::new();
        assert_eq!(
            countdown.update(&rules, 10.0),
            vec![CountdownStage::Steady, CountdownStage::Go, CountdownStage::Hidden]
        );
    }

    #[test]
    fn test_texts() {
        assert_eq!(CountdownStage::Ready.text(), Some("Ready..."));
        assert_eq!(CountdownStage::Go.text(), Some("GO!"));
        assert_eq!(CountdownStage::Hidden.text(), None);
    }
}
