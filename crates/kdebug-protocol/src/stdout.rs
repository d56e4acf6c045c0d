//! The stdout protocol parser. The engine's stdout interleaves ordinary
//! trace text with four kinds of control record — prompts, branching
//! announcements, proof-end sentinels, and configuration dumps — each
//! built around a three-byte binary prefix, [`BYTES_PREFIX`], that
//! brackets every decimal number the engine prints.
//!
//! Resolved open question (see DESIGN.md): the engine always emits the
//! prefix immediately before *and* after a number, so the patterns below
//! fold the leading prefix into the pattern that opens `Number` state and
//! let the trailing prefix arrive as ordinary stream bytes feeding the
//! successor substate's matcher, rather than synthesizing a duplicate
//! three-byte feed. Observably identical for a real byte stream, and it
//! avoids double-counting bytes that never actually repeat.

use kdebug_core::StringFinder;
use kdebug_konfig::{normalize, Konfig};

/// Brackets every decimal number the engine prints on stdout.
pub const BYTES_PREFIX: &[u8] = b"\x00\xff\x00";

fn prefixed(suffix: &[u8]) -> Vec<u8> {
    let mut v = BYTES_PREFIX.to_vec();
    v.extend_from_slice(suffix);
    v
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartTag {
    PromptBegin,
    StepOutcomeBegin,
    ConfigBegin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptAfterNumberTag {
    PromptEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitAfterStepsTag {
    BranchingBegin,
    ProofEndSentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitBranchesTag {
    Separator,
    ListEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigStartAfterNumberTag {
    Is,
}

/// A fully recognized control record from the engine's stdout stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserEvent {
    AtPrompt(u64),
    Branches(u64, Vec<u64>),
    ProofEnd(u64),
    Konfig(u64, Vec<Konfig>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Starting,
    Stepping,
    Konfig,
}

/// What the `Number` substate should transition to once digits end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Successor {
    PromptAfterNumber,
    SplitAfterSteps,
    ConfigStartAfterNumber,
    SplitBranches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sub {
    Start,
    Number(Successor),
    PromptAfterNumber,
    SplitAfterSteps,
    SplitBranches,
    ConfigStartAfterNumber,
    InConfig,
}

/// Parses the engine's stdout byte stream per spec.md §4.3's mode/substate
/// machine. `STARTING` and `STEPPING` share the same pattern set (the
/// distinction only matters for which commands the scheduler is allowed
/// to send); `KONFIG` mode uses an independent matcher so a partial match
/// from one mode never leaks into the other.
pub struct OutputParser {
    mode: Mode,
    sub: Sub,
    start_stepping: StringFinder<StartTag>,
    start_konfig: StringFinder<StartTag>,
    prompt_after_number: StringFinder<PromptAfterNumberTag>,
    split_after_steps: StringFinder<SplitAfterStepsTag>,
    split_branches: StringFinder<SplitBranchesTag>,
    config_start_after_number: StringFinder<ConfigStartAfterNumberTag>,
    number: u64,
    branch_step_count: u64,
    branch_ids: Vec<u64>,
    config_number: u64,
    config_lines: Vec<String>,
    config_current_line: String,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    pub fn new() -> Self {
        Self {
            mode: Mode::Starting,
            sub: Sub::Start,
            start_stepping: StringFinder::new(vec![
                (prefixed_prompt_begin(), StartTag::PromptBegin),
                (b"\nStopped after ".to_vec(), StartTag::StepOutcomeBegin),
            ]),
            start_konfig: StringFinder::new(vec![
                (prefixed_prompt_begin(), StartTag::PromptBegin),
                (b"\nConfig at node ".to_vec(), StartTag::ConfigBegin),
            ]),
            prompt_after_number: StringFinder::new(vec![(prefixed(b")> "), PromptAfterNumberTag::PromptEnd)]),
            split_after_steps: StringFinder::new(vec![
                (prefixed(b" step(s) due to branching on ["), SplitAfterStepsTag::BranchingBegin),
                (
                    prefixed(b" step(s) due to reaching end of proof on current branch."),
                    SplitAfterStepsTag::ProofEndSentinel,
                ),
            ]),
            split_branches: StringFinder::new(vec![
                (prefixed(b","), SplitBranchesTag::Separator),
                (prefixed(b"]"), SplitBranchesTag::ListEnd),
            ]),
            config_start_after_number: StringFinder::new(vec![(prefixed(b" is:"), ConfigStartAfterNumberTag::Is)]),
            number: 0,
            branch_step_count: 0,
            branch_ids: Vec::new(),
            config_number: 0,
            config_lines: Vec::new(),
            config_current_line: String::new(),
        }
    }

    fn reset_all_matchers(&mut self) {
        self.start_stepping.reset();
        self.start_konfig.reset();
        self.prompt_after_number.reset();
        self.split_after_steps.reset();
        self.split_branches.reset();
        self.config_start_after_number.reset();
    }

    /// Resets parser state ahead of issuing a `step` command.
    pub fn prepare_for_step(&mut self) {
        self.mode = Mode::Stepping;
        self.sub = Sub::Start;
        self.reset_all_matchers();
    }

    /// Resets parser state ahead of issuing a `konfig` request.
    pub fn prepare_for_konfig(&mut self) {
        self.mode = Mode::Konfig;
        self.sub = Sub::Start;
        self.reset_all_matchers();
        self.config_lines.clear();
        self.config_current_line.clear();
    }

    /// Feeds one byte of stdout, returning every control record this byte
    /// completed.
    pub fn process(&mut self, byte: u8) -> Vec<ParserEvent> {
        match self.sub {
            Sub::Start => self.process_start(byte),
            Sub::Number(successor) => self.process_number(byte, successor),
            Sub::PromptAfterNumber => self.process_prompt_after_number(byte),
            Sub::SplitAfterSteps => self.process_split_after_steps(byte),
            Sub::SplitBranches => self.process_split_branches(byte),
            Sub::ConfigStartAfterNumber => self.process_config_start_after_number(byte),
            Sub::InConfig => self.process_in_config(byte),
        }
    }

    fn start_matcher_for_mode(&mut self) -> &mut StringFinder<StartTag> {
        match self.mode {
            Mode::Stepping | Mode::Starting => &mut self.start_stepping,
            Mode::Konfig => &mut self.start_konfig,
        }
    }

    fn process_start(&mut self, byte: u8) -> Vec<ParserEvent> {
        let completed = self.start_matcher_for_mode().feed(byte);
        for tag in completed {
            self.number = 0;
            match tag {
                StartTag::PromptBegin => {
                    self.prompt_after_number.reset();
                    self.sub = Sub::Number(Successor::PromptAfterNumber);
                }
                StartTag::StepOutcomeBegin => {
                    self.split_after_steps.reset();
                    self.sub = Sub::Number(Successor::SplitAfterSteps);
                }
                StartTag::ConfigBegin => {
                    self.config_start_after_number.reset();
                    self.sub = Sub::Number(Successor::ConfigStartAfterNumber);
                }
            }
        }
        Vec::new()
    }

    fn process_number(&mut self, byte: u8, successor: Successor) -> Vec<ParserEvent> {
        if byte.is_ascii_digit() {
            self.number = self.number * 10 + u64::from(byte - b'0');
            return Vec::new();
        }
        self.sub = match successor {
            Successor::PromptAfterNumber => Sub::PromptAfterNumber,
            Successor::SplitAfterSteps => Sub::SplitAfterSteps,
            Successor::ConfigStartAfterNumber => Sub::ConfigStartAfterNumber,
            Successor::SplitBranches => Sub::SplitBranches,
        };
        self.process(byte)
    }

    fn process_prompt_after_number(&mut self, byte: u8) -> Vec<ParserEvent> {
        if self.prompt_after_number.feed(byte).is_empty() {
            return Vec::new();
        }
        self.sub = Sub::Start;
        self.start_matcher_for_mode().reset();
        vec![ParserEvent::AtPrompt(self.number)]
    }

    fn process_split_after_steps(&mut self, byte: u8) -> Vec<ParserEvent> {
        let completed = self.split_after_steps.feed(byte);
        let mut events = Vec::new();
        for tag in completed {
            match tag {
                SplitAfterStepsTag::BranchingBegin => {
                    self.branch_step_count = self.number;
                    self.branch_ids.clear();
                    self.number = 0;
                    self.split_branches.reset();
                    self.sub = Sub::Number(Successor::SplitBranches);
                }
                SplitAfterStepsTag::ProofEndSentinel => {
                    events.push(ParserEvent::ProofEnd(self.number));
                    self.sub = Sub::Start;
                    self.start_matcher_for_mode().reset();
                }
            }
        }
        events
    }

    fn process_split_branches(&mut self, byte: u8) -> Vec<ParserEvent> {
        let completed = self.split_branches.feed(byte);
        let mut events = Vec::new();
        for tag in completed {
            match tag {
                SplitBranchesTag::Separator => {
                    self.branch_ids.push(self.number);
                    self.number = 0;
                    self.split_branches.reset();
                    self.sub = Sub::Number(Successor::SplitBranches);
                }
                SplitBranchesTag::ListEnd => {
                    self.branch_ids.push(self.number);
                    events.push(ParserEvent::Branches(self.branch_step_count, std::mem::take(&mut self.branch_ids)));
                    self.sub = Sub::Start;
                    self.start_matcher_for_mode().reset();
                }
            }
        }
        events
    }

    fn process_config_start_after_number(&mut self, byte: u8) -> Vec<ParserEvent> {
        if self.config_start_after_number.feed(byte).is_empty() {
            return Vec::new();
        }
        self.config_number = self.number;
        self.config_lines.clear();
        self.config_current_line.clear();
        self.sub = Sub::InConfig;
        self.start_konfig.reset();
        Vec::new()
    }

    fn process_in_config(&mut self, byte: u8) -> Vec<ParserEvent> {
        // A new prompt starting mid-dump ends the configuration: reprocess
        // the byte through Start so the prompt is recognized normally.
        if self.start_konfig.feed(byte).contains(&StartTag::PromptBegin) {
            if !self.config_current_line.is_empty() {
                self.config_lines.push(std::mem::take(&mut self.config_current_line));
            }
            let konfig = normalize(&self.config_lines);
            let number = self.config_number;
            self.config_lines.clear();
            self.number = 0;
            self.prompt_after_number.reset();
            self.sub = Sub::Number(Successor::PromptAfterNumber);
            return vec![ParserEvent::Konfig(number, konfig)];
        }
        if byte == b'\n' {
            if !self.config_current_line.is_empty() {
                self.config_lines.push(std::mem::take(&mut self.config_current_line));
            } else {
                self.config_current_line.clear();
            }
        } else {
            self.config_current_line.push(byte as char);
        }
        Vec::new()
    }
}

fn prefixed_prompt_begin() -> Vec<u8> {
    let mut v = b"\nKore (".to_vec();
    v.extend_from_slice(BYTES_PREFIX);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut OutputParser, bytes: &[u8]) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        for &b in bytes {
            events.extend(parser.process(b));
        }
        events
    }

    fn prompt(id: u64) -> Vec<u8> {
        let mut v = b"\nKore (".to_vec();
        v.extend_from_slice(BYTES_PREFIX);
        v.extend_from_slice(id.to_string().as_bytes());
        v.extend_from_slice(BYTES_PREFIX);
        v.extend_from_slice(b")> ");
        v
    }

    #[test]
    fn startup_scenario_recognizes_root_prompt() {
        let mut p = OutputParser::new();
        assert_eq!(feed(&mut p, &prompt(0)), vec![ParserEvent::AtPrompt(0)]);
    }

    #[test]
    fn linear_step_scenario_recognizes_next_prompt() {
        let mut p = OutputParser::new();
        p.prepare_for_step();
        assert_eq!(feed(&mut p, &prompt(1)), vec![ParserEvent::AtPrompt(1)]);
    }

    #[test]
    fn branching_scenario_recognizes_branches_then_prompt() {
        let mut p = OutputParser::new();
        p.prepare_for_step();
        let mut stream = b"\nStopped after ".to_vec();
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"3");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b" step(s) due to branching on [");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"2");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b",");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"3");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b",");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"4");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"]");
        stream.extend_from_slice(&prompt(1));
        let events = feed(&mut p, &stream);
        assert_eq!(
            events,
            vec![
                ParserEvent::Branches(3, vec![2, 3, 4]),
                ParserEvent::AtPrompt(1),
            ]
        );
    }

    #[test]
    fn proof_end_scenario_recognizes_sentinel_then_prompt() {
        let mut p = OutputParser::new();
        p.prepare_for_step();
        let mut stream = b"\nStopped after ".to_vec();
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"5");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b" step(s) due to reaching end of proof on current branch.");
        stream.extend_from_slice(&prompt(7));
        let events = feed(&mut p, &stream);
        assert_eq!(events, vec![ParserEvent::ProofEnd(5), ParserEvent::AtPrompt(7)]);
    }

    #[test]
    fn configuration_dump_scenario_normalizes_lines() {
        let mut p = OutputParser::new();
        p.prepare_for_konfig();
        let mut stream = b"\nConfig at node ".to_vec();
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b"7");
        stream.extend_from_slice(BYTES_PREFIX);
        stream.extend_from_slice(b" is:\nfoo\nbar\n");
        stream.extend_from_slice(&prompt(7));
        let events = feed(&mut p, &stream);
        assert_eq!(events.len(), 2);
        match &events[0] {
            ParserEvent::Konfig(id, lines) => {
                assert_eq!(*id, 7);
                assert_eq!(lines.len(), 2);
            }
            other => panic!("expected Konfig, got {other:?}"),
        }
        assert_eq!(events[1], ParserEvent::AtPrompt(7));
    }
}
