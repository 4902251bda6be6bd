use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::controller::Error;

const POSITIVE_RESPONSES: [&str; 2] = ["yes", "y"];
const NEGATIVE_RESPONSES: [&str; 2] = ["no", "n"];

/// Source of operator answers for the configuration wizard.
///
/// Implementors provide raw line I/O; the answer validation loops are shared.
#[async_trait]
pub trait Prompter: Send {
    /// Shows `question` and returns the next trimmed line of input.
    async fn read_line(&mut self, question: &str) -> Result<String, Error>;

    fn show(&mut self, message: &str);

    fn report_error(&mut self, message: &str);

    async fn confirm(&mut self, question: &str) -> Result<bool, Error> {
        let question = format!("{} [y/n]:", question);
        loop {
            let answer = self.read_line(&question).await?.to_lowercase();
            if POSITIVE_RESPONSES.contains(&answer.as_str()) {
                return Ok(true);
            };
            if NEGATIVE_RESPONSES.contains(&answer.as_str()) {
                return Ok(false);
            };
            self.report_error("Please type yes or no:");
        }
    }

    /// Free text, re-prompting until a non-empty answer arrives.
    async fn ask(&mut self, question: &str) -> Result<String, Error> {
        loop {
            let answer = self.read_line(question).await?;
            if !answer.is_empty() {
                return Ok(answer);
            };
            self.report_error("--Error, please enter a value:");
        }
    }

    async fn ask_optional(&mut self, question: &str) -> Result<String, Error> {
        self.read_line(question).await
    }

    async fn choose(&mut self, question: &str, options: &[&str]) -> Result<String, Error> {
        let question = format!("{} [{}]:", question, options.join("/"));
        loop {
            let answer = self.read_line(&question).await?;
            if options.contains(&answer.as_str()) {
                return Ok(answer);
            };
            self.report_error(&format!("Please choose one of: {}", options.join(", ")));
        }
    }
}

pub struct TerminalPrompt {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalPrompt {
    pub fn new() -> TerminalPrompt {
        TerminalPrompt {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for TerminalPrompt {
    async fn read_line(&mut self, question: &str) -> Result<String, Error> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{} ", question).as_bytes()).await?;
        stdout.flush().await?;

        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(Error::PromptClosed),
        }
    }

    fn show(&mut self, message: &str) {
        println!("{}", message);
    }

    fn report_error(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Answers supplied up front, for non-interactive runs. Everything shown
/// is kept in a transcript.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> ScriptedPrompt
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedPrompt {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Reads a JSON array of answers.
    pub async fn from_file(path: &Path) -> Result<ScriptedPrompt, Error> {
        let raw = tokio::fs::read_to_string(path).await?;
        let answers: Vec<String> = serde_json::from_str(&raw)?;
        Ok(ScriptedPrompt::new(answers))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompt {
    async fn read_line(&mut self, question: &str) -> Result<String, Error> {
        self.questions.push(question.to_string());
        match self.answers.pop_front() {
            Some(answer) => Ok(answer.trim().to_string()),
            None => Err(Error::PromptClosed),
        }
    }

    fn show(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
