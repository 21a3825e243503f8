//! Stimulus scheduler — which symbol each input channel carries at time `t`.
//!
//! A [`Timeline`] is a fixed table of open time intervals per channel. It is
//! evaluated as a pure function of an explicit simulated time, with no
//! notion of "time since creation". Instants that fall exactly on an
//! interval boundary belong to no interval and emit ZERO.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ENCODE_PERIOD, PROBE_PERIOD};
use crate::core::vector::SymbolVector;
use crate::core::vocabulary::Vocabulary;
use crate::error::Result;

/// Stimulus output channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// First operand of the stored binding (colour).
    A,
    /// Second operand of the stored binding (shape).
    B,
    /// Query role probing the memory.
    E,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::A, Channel::B, Channel::E];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::A => "A",
            Channel::B => "B",
            Channel::E => "E",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A symbol (or silence) held over the open interval `(start, end)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub start: f64,
    pub end: f64,
    pub symbol: Option<String>,
}

impl Phase {
    pub fn new(start: f64, end: f64, symbol: &str) -> Self {
        Self {
            start,
            end,
            symbol: Some(symbol.to_string()),
        }
    }

    /// Strict on both ends.
    pub fn contains(&self, t: f64) -> bool {
        self.start < t && t < self.end
    }
}

/// Phases for one channel, optionally repeating after an onset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelTimeline {
    /// Before this time the channel is silent.
    pub onset: f64,

    /// When set, phases are matched against `t % period`.
    pub period: Option<f64>,

    pub phases: Vec<Phase>,
}

impl ChannelTimeline {
    /// One-shot phases evaluated against absolute time.
    pub fn once(phases: Vec<Phase>) -> Self {
        Self {
            onset: f64::NEG_INFINITY,
            period: None,
            phases,
        }
    }

    /// Phases that repeat every `period` seconds once `t >= onset`.
    pub fn repeating(onset: f64, period: f64, phases: Vec<Phase>) -> Self {
        Self {
            onset,
            period: Some(period),
            phases,
        }
    }

    /// Active symbol at time `t`, or `None` for ZERO.
    pub fn symbol_at(&self, t: f64) -> Option<&str> {
        if t < self.onset {
            return None;
        }
        let local = match self.period {
            Some(p) => t % p,
            None => t,
        };
        self.phases
            .iter()
            .find(|phase| phase.contains(local))
            .and_then(|phase| phase.symbol.as_deref())
    }
}

/// Stimulus table for channels A, B and E.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub a: ChannelTimeline,
    pub b: ChannelTimeline,
    pub e: ChannelTimeline,
}

impl Timeline {
    /// The question-answering scenario.
    ///
    /// - A: RED on (0, 0.25), BLUE on (0.25, 0.5)
    /// - B: CIRCLE on (0, 0.25), SQUARE on (0.25, 0.5)
    /// - E: silent before 0.5, then every 0.5 s: CIRCLE, RED, SQUARE, BLUE
    ///   on consecutive 0.1 s windows, then 0.1 s of silence
    pub fn question_answering() -> Self {
        let half = ENCODE_PERIOD / 2.0;
        Self {
            a: ChannelTimeline::once(vec![
                Phase::new(0.0, half, "RED"),
                Phase::new(half, ENCODE_PERIOD, "BLUE"),
            ]),
            b: ChannelTimeline::once(vec![
                Phase::new(0.0, half, "CIRCLE"),
                Phase::new(half, ENCODE_PERIOD, "SQUARE"),
            ]),
            e: ChannelTimeline::repeating(
                ENCODE_PERIOD,
                PROBE_PERIOD,
                vec![
                    Phase::new(0.0, 0.1, "CIRCLE"),
                    Phase::new(0.1, 0.2, "RED"),
                    Phase::new(0.2, 0.3, "SQUARE"),
                    Phase::new(0.3, 0.4, "BLUE"),
                ],
            ),
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelTimeline {
        match channel {
            Channel::A => &self.a,
            Channel::B => &self.b,
            Channel::E => &self.e,
        }
    }

    /// Active symbol on `channel` at `t`.
    pub fn symbol_at(&self, channel: Channel, t: f64) -> Option<&str> {
        self.channel(channel).symbol_at(t)
    }

    /// Every symbol the timeline mentions, first appearance first.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for channel in Channel::ALL {
            for phase in &self.channel(channel).phases {
                if let Some(name) = phase.symbol.as_deref() {
                    if !seen.contains(&name) {
                        seen.push(name);
                    }
                }
            }
        }
        seen
    }
}

/// A timeline with its symbols resolved to vectors.
///
/// Resolution happens once at construction; [`emit`](Self::emit) is then a
/// pure lookup that can be called from any thread.
#[derive(Clone, Debug)]
pub struct StimulusScheduler {
    timeline: Timeline,
    vectors: HashMap<String, SymbolVector>,
    zero: SymbolVector,
}

impl StimulusScheduler {
    /// Resolve every timeline symbol through `vocab`, creating missing ones.
    pub fn new(timeline: Timeline, vocab: &mut Vocabulary) -> Result<Self> {
        let mut vectors = HashMap::new();
        for name in timeline.symbols() {
            vectors.insert(name.to_string(), vocab.parse(name)?);
        }
        Ok(Self {
            zero: SymbolVector::zeros(vocab.dimension()),
            timeline,
            vectors,
        })
    }

    /// Vector on `channel` at simulated time `t` (seconds since start).
    pub fn emit(&self, channel: Channel, t: f64) -> &SymbolVector {
        self.timeline
            .symbol_at(channel, t)
            .and_then(|name| self.vectors.get(name))
            .unwrap_or(&self.zero)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn zero(&self) -> &SymbolVector {
        &self.zero
    }
}
