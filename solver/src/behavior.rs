//! Closed catalog of strategies for repeated two-action games.
//!
//! Every variant is a memory-one strategy: a first-move cooperation probability plus
//! one cooperation probability for each previous (own, opponent) action pair. That
//! uniform shape is what lets [`crate::game::NormalFormGame`] compute exact expected
//! payoffs without sampling.
//!
//! Behaviors parse from short names:
//!
//! | Name | Variant |
//! |------|---------|
//! | `allc`, `cooperator` | [`Behavior::Cooperator`] |
//! | `alld`, `defector` | [`Behavior::Defector`] |
//! | `random:p` | [`Behavior::Random`] |
//! | `tft` | [`Behavior::TitForTat`] |
//! | `stft` | [`Behavior::SuspiciousTitForTat`] |
//! | `gtft:g` | [`Behavior::GenerousTitForTat`] |
//! | `grim` | [`Behavior::GrimTrigger`] |
//! | `wsls`, `pavlov` | [`Behavior::WinStayLoseShift`] |
//! | `memory1:f,cc,cd,dc,dd` | [`Behavior::MemoryOne`] |

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EgtError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Cooperate,
    Defect,
}

impl Action {
    /// Row/column of this action in a 2×2 stage payoff matrix.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Action::Cooperate => 0,
            Action::Defect => 1,
        }
    }
}

/// What a behavior can observe when choosing its next action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionContext {
    pub round: usize,
    pub own_last: Option<Action>,
    pub opponent_last: Option<Action>,
}

impl ActionContext {
    /// Context for the round after `own` and `opponent` were played.
    pub fn after(self, own: Action, opponent: Action) -> Self {
        Self {
            round: self.round + 1,
            own_last: Some(own),
            opponent_last: Some(opponent),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    Cooperator,
    Defector,
    /// Cooperates with probability `p` every round.
    Random { p: f64 },
    TitForTat,
    /// Tit-for-tat that opens with defection.
    SuspiciousTitForTat,
    /// Tit-for-tat that forgives a defection with probability `generosity`.
    GenerousTitForTat { generosity: f64 },
    /// Cooperates until either player defects, then defects forever.
    GrimTrigger,
    /// Pavlov: repeat the last action after mutual agreement, switch otherwise.
    WinStayLoseShift,
    /// General memory-one strategy, cooperation probabilities after (own, opponent).
    MemoryOne {
        first: f64,
        cc: f64,
        cd: f64,
        dc: f64,
        dd: f64,
    },
}

impl Behavior {
    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Cooperator => "Cooperator",
            Behavior::Defector => "Defector",
            Behavior::Random { .. } => "Random",
            Behavior::TitForTat => "TitForTat",
            Behavior::SuspiciousTitForTat => "SuspiciousTitForTat",
            Behavior::GenerousTitForTat { .. } => "GenerousTitForTat",
            Behavior::GrimTrigger => "GrimTrigger",
            Behavior::WinStayLoseShift => "WinStayLoseShift",
            Behavior::MemoryOne { .. } => "MemoryOne",
        }
    }

    /// Probability of cooperating in the first round.
    pub fn first_move(&self) -> f64 {
        match *self {
            Behavior::Cooperator => 1.0,
            Behavior::Defector => 0.0,
            Behavior::Random { p } => p,
            Behavior::TitForTat => 1.0,
            Behavior::SuspiciousTitForTat => 0.0,
            Behavior::GenerousTitForTat { .. } => 1.0,
            Behavior::GrimTrigger => 1.0,
            Behavior::WinStayLoseShift => 1.0,
            Behavior::MemoryOne { first, .. } => first,
        }
    }

    /// Probability of cooperating after the previous round was (`own`, `opponent`).
    pub fn response(&self, own: Action, opponent: Action) -> f64 {
        use Action::{Cooperate as C, Defect as D};
        match *self {
            Behavior::Cooperator => 1.0,
            Behavior::Defector => 0.0,
            Behavior::Random { p } => p,
            Behavior::TitForTat | Behavior::SuspiciousTitForTat => match opponent {
                C => 1.0,
                D => 0.0,
            },
            Behavior::GenerousTitForTat { generosity } => match opponent {
                C => 1.0,
                D => generosity,
            },
            Behavior::GrimTrigger => match (own, opponent) {
                (C, C) => 1.0,
                _ => 0.0,
            },
            Behavior::WinStayLoseShift => {
                if own == opponent {
                    1.0
                } else {
                    0.0
                }
            }
            Behavior::MemoryOne { cc, cd, dc, dd, .. } => match (own, opponent) {
                (C, C) => cc,
                (C, D) => cd,
                (D, C) => dc,
                (D, D) => dd,
            },
        }
    }

    pub fn cooperation_probability(&self, context: &ActionContext) -> f64 {
        match (context.own_last, context.opponent_last) {
            (Some(own), Some(opponent)) => self.response(own, opponent),
            _ => self.first_move(),
        }
    }

    /// Sample the next action.
    pub fn act<R: Rng + ?Sized>(&self, context: &ActionContext, rng: &mut R) -> Action {
        let p = self.cooperation_probability(context);
        if p >= 1.0 || (p > 0.0 && rng.random::<f64>() < p) {
            Action::Cooperate
        } else {
            Action::Defect
        }
    }

    /// True when no probability lies strictly between 0 and 1.
    pub fn is_deterministic(&self) -> bool {
        self.probabilities().iter().all(|&p| p == 0.0 || p == 1.0)
    }

    fn probabilities(&self) -> [f64; 5] {
        use Action::{Cooperate as C, Defect as D};
        [
            self.first_move(),
            self.response(C, C),
            self.response(C, D),
            self.response(D, C),
            self.response(D, D),
        ]
    }

    /// Every probability parameter must lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self
            .probabilities()
            .iter()
            .any(|p| !(0.0..=1.0).contains(p))
        {
            return Err(EgtError::invalid(
                "behavior",
                format!("{self} has a probability outside [0, 1]"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Behavior::Random { p } => write!(f, "Random({p})"),
            Behavior::GenerousTitForTat { generosity } => {
                write!(f, "GenerousTitForTat({generosity})")
            }
            Behavior::MemoryOne {
                first,
                cc,
                cd,
                dc,
                dd,
            } => write!(f, "MemoryOne({first}; {cc}, {cd}, {dc}, {dd})"),
            _ => f.write_str(self.name()),
        }
    }
}

fn parse_probability(raw: &str, name: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| EgtError::invalid("behavior", format!("bad probability '{raw}' in '{name}'")))
}

impl FromStr for Behavior {
    type Err = EgtError;

    fn from_str(name: &str) -> Result<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let (kind, args) = match lowered.split_once(':') {
            Some((kind, args)) => (kind, Some(args)),
            None => (lowered.as_str(), None),
        };

        let behavior = match (kind, args) {
            ("allc" | "cooperator", None) => Behavior::Cooperator,
            ("alld" | "defector", None) => Behavior::Defector,
            ("tft", None) => Behavior::TitForTat,
            ("stft", None) => Behavior::SuspiciousTitForTat,
            ("grim", None) => Behavior::GrimTrigger,
            ("wsls" | "pavlov", None) => Behavior::WinStayLoseShift,
            ("random", Some(p)) => Behavior::Random {
                p: parse_probability(p, name)?,
            },
            ("gtft", Some(g)) => Behavior::GenerousTitForTat {
                generosity: parse_probability(g, name)?,
            },
            ("memory1", Some(list)) => {
                let values = list
                    .split(',')
                    .map(|v| parse_probability(v, name))
                    .collect::<Result<Vec<f64>>>()?;
                let &[first, cc, cd, dc, dd] = values.as_slice() else {
                    return Err(EgtError::invalid(
                        "behavior",
                        format!("'{name}' needs exactly 5 probabilities"),
                    ));
                };
                Behavior::MemoryOne {
                    first,
                    cc,
                    cd,
                    dc,
                    dd,
                }
            }
            _ => {
                return Err(EgtError::invalid(
                    "behavior",
                    format!("unknown behavior '{name}'"),
                ))
            }
        };
        behavior.validate()?;
        Ok(behavior)
    }
}
