//! Operator recovery for failed evaluations.
//!
//! The protocol is a fixed three-way choice. Choice parsing is pure; the
//! blocking terminal read is isolated here so the engine never touches
//! stdin.

use std::io::{self, BufRead, Write};

use crate::engine::{DecisionSource, EvalFailure};
use crate::model::CommitRecord;

/// What to do with a commit whose evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Re-attempt the full evaluation immediately.
    Retry,

    /// Mark the commit permanently broken. Never retried.
    MarkBroken,

    /// Leave the commit pending and move on for this run.
    Skip,
}

/// Maps one line of operator input to a decision.
///
/// Accepts exactly `r`, `b`, or `s`; anything else means ask again.
pub fn parse_choice(input: &str) -> Option<Decision> {
    match input.trim() {
        "r" => Some(Decision::Retry),
        "b" => Some(Decision::MarkBroken),
        "s" => Some(Decision::Skip),
        _ => None,
    }
}

/// Blocking prompt on the controlling terminal.
pub struct TerminalPrompt;

impl DecisionSource for TerminalPrompt {
    fn decide(&mut self, _commit: &CommitRecord, _failure: &EvalFailure) -> io::Result<Decision> {
        prompt_for_decision(&mut io::stdin().lock(), &mut io::stdout())
    }
}

/// Reads lines until one parses as a decision.
///
/// Re-prompts indefinitely on invalid input. EOF is an error: the
/// operator is gone and the run cannot make progress.
fn prompt_for_decision(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<Decision> {
    loop {
        write!(output, "(r)etry, permanently mark (b)roken, or (s)kip for now: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "end of input while waiting for a decision",
            ));
        }
        if let Some(decision) = parse_choice(&line) {
            return Ok(decision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn decide(input: &str) -> io::Result<Decision> {
        let mut output = Vec::new();
        prompt_for_decision(&mut Cursor::new(input), &mut output)
    }

    #[test]
    fn accepts_each_valid_choice() {
        assert_eq!(parse_choice("r"), Some(Decision::Retry));
        assert_eq!(parse_choice("b"), Some(Decision::MarkBroken));
        assert_eq!(parse_choice("s"), Some(Decision::Skip));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("q"), None);
        assert_eq!(parse_choice("retry"), None);
        assert_eq!(parse_choice("rb"), None);
    }

    #[test]
    fn choice_input_is_trimmed() {
        assert_eq!(parse_choice(" r \n"), Some(Decision::Retry));
    }

    #[test]
    fn reprompts_until_valid_input() {
        assert_eq!(decide("x\nquit\nb\n").unwrap(), Decision::MarkBroken);
    }

    #[test]
    fn prompt_repeats_on_each_attempt() {
        let mut output = Vec::new();
        prompt_for_decision(&mut Cursor::new("x\ns\n"), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("(r)etry").count(), 2);
    }

    #[test]
    fn end_of_input_is_an_error() {
        let err = decide("").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
