use anyhow::{Context, Result};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::io::{BufRead, Write};

/// Where prompt answers come from.
pub trait LineSource {
    /// Read one answer, showing `prompt`. `None` means the user is done
    /// (end of input or Ctrl-C).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Terminal input with line editing and history.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("initializing line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("reading answer"),
        }
    }
}

// Plain readers (piped stdin, in-memory answers) never echo the prompt.
impl<R: BufRead> LineSource for R {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        if BufRead::read_line(self, &mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Ask the user to pick one of `options`.
///
/// Options are listed from 1. An empty answer takes the first option. An
/// answer equal to an option label picks that option; otherwise a number
/// picks by position. Labels win so numeric ids can be typed as shown.
/// Bad answers re-prompt. End of input (or no options) returns `None`.
pub fn choose<L, W>(
    prompt: &str,
    options: &[String],
    input: &mut L,
    output: &mut W,
) -> Result<Option<usize>>
where
    L: LineSource + ?Sized,
    W: Write,
{
    if options.is_empty() {
        return Ok(None);
    }

    loop {
        writeln!(output, "{}", prompt)?;
        for (i, label) in options.iter().enumerate() {
            writeln!(output, "  {:>3}) {}", i + 1, label)?;
        }
        output.flush()?;

        let line = match input.read_line("> ")? {
            Some(line) => line,
            None => return Ok(None),
        };
        let answer = line.trim();

        if answer.is_empty() {
            return Ok(Some(0));
        }
        if let Some(idx) = options.iter().position(|o| o == answer) {
            return Ok(Some(idx));
        }
        if let Ok(n) = answer.parse::<usize>() {
            if (1..=options.len()).contains(&n) {
                return Ok(Some(n - 1));
            }
        }
        writeln!(output, "Opção inválida: {}", answer)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Vec<String> {
        vec!["2024".into(), "2023".into(), "2019".into()]
    }

    fn run(answers: &str) -> (Option<usize>, String) {
        let mut input = answers.as_bytes();
        let mut out = Vec::new();
        let picked = choose("Ano:", &opts(), &mut input, &mut out).unwrap();
        (picked, String::from_utf8(out).unwrap())
    }

    #[test]
    fn blank_answer_takes_first() {
        assert_eq!(run("\n").0, Some(0));
    }

    #[test]
    fn number_and_label() {
        assert_eq!(run("3\n").0, Some(2));
        assert_eq!(run("2023\n").0, Some(1));
    }

    #[test]
    fn numeric_labels_win_over_positions() {
        let ids: Vec<String> = vec!["7".into(), "1".into()];
        let mut input = "1\n".as_bytes();
        let mut out = Vec::new();
        assert_eq!(choose("Projeto:", &ids, &mut input, &mut out).unwrap(), Some(1));

        // no label "2", so it is still a position
        let mut input = "2\n".as_bytes();
        assert_eq!(choose("Projeto:", &ids, &mut input, &mut out).unwrap(), Some(1));
    }

    #[test]
    fn invalid_answers_reprompt() {
        let (picked, out) = run("9\nxyz\n2\n");
        assert_eq!(picked, Some(1));
        assert_eq!(out.matches("Opção inválida").count(), 2);
        assert_eq!(out.matches("Ano:").count(), 3);
    }

    #[test]
    fn end_of_input_picks_nothing() {
        assert_eq!(run("").0, None);
        let mut input = "1\n".as_bytes();
        let mut out = Vec::new();
        assert_eq!(choose("x", &[], &mut input, &mut out).unwrap(), None);
    }

    #[test]
    fn trait_objects_work_as_input() {
        let mut answers = "2\n".as_bytes();
        let input: &mut dyn LineSource = &mut answers;
        let mut out = Vec::new();
        assert_eq!(choose("Ano:", &opts(), input, &mut out).unwrap(), Some(1));
    }
}
