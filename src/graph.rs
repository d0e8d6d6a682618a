//! Control-flow graphs for the two agents.
//!
//! The graphs are tiny and fixed, so they are described as data (for
//! printing) and driven by [`LoopState`] transitions rather than a general
//! graph executor.

use std::fmt::Write as _;

use crate::types::Transcript;

pub const START: &str = "__start__";
pub const END: &str = "__end__";
pub const GENERATE: &str = "generate";
pub const REFLECT: &str = "reflect";
pub const ACTOR: &str = "actor";

/// State of the generate/reflect loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Generate,
    Reflect,
    Terminated,
}

/// Predicate deciding when the generate/reflect loop ends.
///
/// Evaluated each time the loop enters `Generate`, before the generation
/// step runs, with the transcript so far and the number of generation steps
/// already executed (0 on the first check).
pub trait StopCondition {
    fn should_stop(&self, transcript: &Transcript, rounds: u32) -> bool;
}

impl<F> StopCondition for F
where
    F: Fn(&Transcript, u32) -> bool,
{
    fn should_stop(&self, transcript: &Transcript, rounds: u32) -> bool {
        self(transcript, rounds)
    }
}

/// Stop once the transcript holds more than the wrapped number of messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxMessages(pub usize);

impl Default for MaxMessages {
    fn default() -> Self {
        MaxMessages(6)
    }
}

impl StopCondition for MaxMessages {
    fn should_stop(&self, transcript: &Transcript, _rounds: u32) -> bool {
        transcript.len() > self.0
    }
}

impl LoopState {
    /// Transition out of `self`, decided on the transcript entering it.
    ///
    /// Leaving `Generate` for `Reflect` means a generation step runs;
    /// leaving `Reflect` means a reflection step runs.
    pub fn next(self, stop: &dyn StopCondition, transcript: &Transcript, rounds: u32) -> LoopState {
        match self {
            LoopState::Generate if stop.should_stop(transcript, rounds) => LoopState::Terminated,
            LoopState::Generate => LoopState::Reflect,
            LoopState::Reflect => LoopState::Generate,
            LoopState::Terminated => LoopState::Terminated,
        }
    }

    pub fn node_name(self) -> &'static str {
        match self {
            LoopState::Generate => GENERATE,
            LoopState::Reflect => REFLECT,
            LoopState::Terminated => END,
        }
    }
}

/// Edge between two nodes; conditional edges are taken only when their
/// router picks them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub conditional: bool,
}

/// Static description of an agent's control flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub nodes: Vec<&'static str>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// `generate` routes to `reflect` or the end; `reflect` always returns
    pub fn reflection() -> Self {
        Self {
            nodes: vec![START, GENERATE, REFLECT, END],
            edges: vec![
                Edge { from: START, to: GENERATE, conditional: false },
                Edge { from: GENERATE, to: REFLECT, conditional: true },
                Edge { from: GENERATE, to: END, conditional: true },
                Edge { from: REFLECT, to: GENERATE, conditional: false },
            ],
        }
    }

    /// Single-shot actor
    pub fn actor() -> Self {
        Self {
            nodes: vec![START, ACTOR, END],
            edges: vec![
                Edge { from: START, to: ACTOR, conditional: false },
                Edge { from: ACTOR, to: END, conditional: false },
            ],
        }
    }

    /// Render nodes as boxes followed by the edge list.
    ///
    /// Fixed edges are drawn `--->`, conditional ones `-.->`.
    pub fn draw_ascii(&self) -> String {
        let width = self.nodes.iter().map(|n| n.len()).max().unwrap_or(0) + 2;
        let border = format!("+{}+", "-".repeat(width));
        let mut out = String::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(out, "{:^w$}", "|", w = width + 2);
                let _ = writeln!(out, "{:^w$}", "v", w = width + 2);
            }
            let _ = writeln!(out, "{}", border);
            let _ = writeln!(out, "|{:^w$}|", node, w = width);
            let _ = writeln!(out, "{}", border);
        }

        out.push('\n');
        for edge in &self.edges {
            let arrow = if edge.conditional { "-.->" } else { "--->" };
            let _ = writeln!(out, "  {} {} {}", edge.from, arrow, edge.to);
        }
        out
    }
}
