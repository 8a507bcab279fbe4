//! Line-oriented input and output for the menus.
//!
//! Generic over `BufRead`/`Write` so sessions can be scripted in tests.
//! End of input surfaces as `io::ErrorKind::UnexpectedEof`, which the
//! session loop treats as "quit".

use std::fmt::Display;
use std::io::{self, BufRead, Write};

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints one line.
    pub fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.output)
    }

    /// Prints `label: ` and reads one trimmed line.
    pub fn ask(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Like [`ask`](Self::ask) with a default shown in brackets and used for
    /// a blank answer.
    pub fn ask_or(&mut self, label: &str, default: &str) -> io::Result<String> {
        let answer = self.ask(&format!("{} [{}]", label, default))?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Asks for an optional value: blank means `None`.
    pub fn ask_optional(&mut self, label: &str) -> io::Result<Option<String>> {
        let answer = self.ask(label)?;
        Ok(if answer.is_empty() { None } else { Some(answer) })
    }

    /// Prints a titled menu of `(key, label)` entries and reads the choice,
    /// lowercased.
    pub fn menu(&mut self, title: &str, entries: &[(&str, &str)]) -> io::Result<String> {
        self.blank()?;
        self.say(format!("== {} ==", title))?;
        for (key, label) in entries {
            self.say(format!("  [{}] {}", key, label))?;
        }
        Ok(self.ask(">")?.to_lowercase())
    }

    /// Yes/no question; only `y` and `yes` count as yes.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} (y/N)", question))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}
