//! The human at the bench.
//!
//! Tests talk to the operator through the [`Operator`] trait: plain status
//! lines, instructional prompts, and yes/no questions. The console
//! implementation is what the binary uses; the scripted one replays canned
//! answers and records everything it was told, which is how the suite is
//! exercised without a person present.

use crate::color::{paint, ConsoleStyles};
use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::{Mutex, PoisonError};

/// Interprets a yes/no answer. Empty input means yes.
pub fn parse_yes_no(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Console side of the harness.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Show a line of output.
    fn say(&self, line: &str);

    /// Ask a question and return the raw answer.
    async fn ask(&self, question: &str) -> AppResult<String>;

    /// Show an instruction the operator has to act on.
    fn prompt(&self, message: &str) {
        let styles = ConsoleStyles::default();
        self.say(&format!("{} {message}", paint(">>>", styles.prompt)));
    }
}

/// Operator on stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

#[async_trait]
impl Operator for ConsoleOperator {
    fn say(&self, line: &str) {
        println!("{line}");
    }

    async fn ask(&self, question: &str) -> AppResult<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        // stdin has no async reader worth the name; park a blocking thread.
        let answer = tokio::task::spawn_blocking(|| read_answer(&mut std::io::stdin().lock()))
            .await
            .map_err(std::io::Error::other)??;
        Ok(answer)
    }
}

/// Read one answer line. A closed input is an error, never an empty answer.
fn read_answer(input: &mut impl BufRead) -> std::io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "operator input closed",
        ));
    }
    Ok(line)
}

/// Operator that answers every question with the default.
#[derive(Debug, Default)]
pub struct AutoConfirmOperator;

#[async_trait]
impl Operator for AutoConfirmOperator {
    fn say(&self, line: &str) {
        println!("{line}");
    }

    async fn ask(&self, question: &str) -> AppResult<String> {
        println!("{question}");
        Ok(String::new())
    }
}

type PromptHook = Box<dyn Fn(&str) + Send + Sync>;

/// Replays queued answers and records the console transcript.
///
/// Once the queue is empty every question is answered with the empty string.
#[derive(Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<String>>,
    transcript: Mutex<Vec<String>>,
    on_prompt: Option<PromptHook>,
}

impl ScriptedOperator {
    /// Operator that answers with the given strings, in order.
    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Run `hook` with the raw message whenever a prompt is shown.
    pub fn on_prompt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_prompt = Some(Box::new(hook));
        self
    }

    /// Every line shown so far, with styling removed.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, line: &str) {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(strip_ansi_escapes::strip_str(line));
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    fn say(&self, line: &str) {
        self.record(line);
    }

    async fn ask(&self, question: &str) -> AppResult<String> {
        self.record(question);
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(answer.unwrap_or_default())
    }

    fn prompt(&self, message: &str) {
        self.record(&format!(">>> {message}"));
        if let Some(hook) = &self.on_prompt {
            hook(message);
        }
    }
}
