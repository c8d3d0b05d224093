//! Interactive questions.
//!
//! Commands that need an answer from the user go through [`Prompt`] so tests
//! can script the answers.

use std::io::{self, BufRead, Write};

use corollary_core::CommandError;

/// Asks the user a question and returns the trimmed answer.
pub trait Prompt: Send + Sync {
    fn ask(&self, question: &str) -> Result<String, CommandError>;
}

/// Asks on stderr and reads the answer from stdin.
///
/// The question goes to stderr so that stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str) -> Result<String, CommandError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        ask_with(&mut input, &mut io::stderr(), question)
    }
}

/// Write `question` to `output` and read one line from `input`.
///
/// End of input counts as an empty answer.
pub fn ask_with(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
) -> Result<String, CommandError> {
    write!(output, "{question} ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Returns `true` for a `y`/`Y` answer.
pub fn is_yes(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned answers and records the questions.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompt {
        answers: Mutex<VecDeque<String>>,
        pub questions: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                questions: Mutex::default(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&self, question: &str) -> Result<String, CommandError> {
            self.questions.lock().unwrap().push(question.to_string());
            Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_with_trims_answer_and_shows_question() {
        let mut input = io::Cursor::new("  1.2.3 \n");
        let mut output = Vec::new();
        let answer = ask_with(&mut input, &mut output, "Version?").unwrap();
        assert_eq!(answer, "1.2.3");
        assert_eq!(String::from_utf8(output).unwrap(), "Version? ");
    }

    #[test]
    fn end_of_input_is_empty_answer() {
        let mut input = io::Cursor::new("");
        let answer = ask_with(&mut input, &mut Vec::new(), "Version?").unwrap();
        assert_eq!(answer, "");
    }

    #[test]
    fn yes_is_case_insensitive() {
        assert!(is_yes("y"));
        assert!(is_yes("Y"));
        assert!(!is_yes("yes"));
        assert!(!is_yes(""));
    }
}
