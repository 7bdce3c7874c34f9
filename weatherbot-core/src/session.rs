use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

use crate::{agent::AgentExecutor, model::ChatHistory};

pub const EXIT_KEYWORD: &str = "exit";

/// Source of user input, one line per turn.
pub trait Prompter {
    /// `Ok(None)` means the user closed the input; the session ends.
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// The console conversation: one agent, one growing history.
#[derive(Debug)]
pub struct Session {
    agent: AgentExecutor,
    history: ChatHistory,
}

impl Session {
    pub fn new(agent: AgentExecutor) -> Self {
        Self { agent, history: ChatHistory::new() }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Loop until the user types `exit` or input ends.
    ///
    /// A failing turn is reported on `out` and leaves the history untouched.
    pub async fn run<P, W>(&mut self, prompter: &mut P, out: &mut W) -> Result<()>
    where
        P: Prompter + ?Sized,
        W: Write + ?Sized,
    {
        writeln!(out, "Simple Weather Bot: Ask me about the current weather in any city!")?;
        writeln!(out, "Type '{EXIT_KEYWORD}' to quit.")?;

        loop {
            let Some(line) = prompter.read_line().context("Failed to read user input")? else {
                writeln!(out, "Goodbye!")?;
                return Ok(());
            };

            let input = line.trim();
            if input.eq_ignore_ascii_case(EXIT_KEYWORD) {
                writeln!(out, "Goodbye!")?;
                return Ok(());
            }
            if input.is_empty() {
                continue;
            }

            match self.turn(input).await {
                Ok(reply) => writeln!(out, "Bot: {reply}")?,
                Err(err) => {
                    debug!("turn failed: {err:#}");
                    writeln!(out, "An error occurred: {err:#}")?;
                    writeln!(
                        out,
                        "Please try again or check the logs if you are encountering repeated issues."
                    )?;
                }
            }
            out.flush()?;
        }
    }

    /// One exchange. History is only extended once the agent has replied.
    pub async fn turn(&mut self, input: &str) -> Result<String> {
        let reply = self.agent.invoke(&self.history, input).await?;
        self.history.push_exchange(input, reply.clone());
        info!(turns = self.history.len(), "turn completed");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{AssistantReply, tests::ScriptedModel},
        model::ChatTurn,
        tool::ToolRegistry,
    };
    use std::collections::VecDeque;

    /// Feeds a fixed script of lines, then reports end of input.
    struct ScriptedPrompter {
        lines: VecDeque<String>,
    }

    impl ScriptedPrompter {
        fn new(lines: &[&str]) -> Self {
            Self { lines: lines.iter().map(|l| l.to_string()).collect() }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn read_line(&mut self) -> Result<Option<String>> {
            Ok(self.lines.pop_front())
        }
    }

    fn session(replies: Vec<Result<AssistantReply, String>>) -> Session {
        let model = ScriptedModel::new(replies);
        Session::new(AgentExecutor::new(Box::new(model), ToolRegistry::new()))
    }

    async fn run(session: &mut Session, lines: &[&str]) -> String {
        let mut out = Vec::new();
        session.run(&mut ScriptedPrompter::new(lines), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn exit_is_case_insensitive() {
        let mut session = session(vec![]);

        let out = run(&mut session, &["  EXIT ", "never read"]).await;

        assert!(out.starts_with("Simple Weather Bot:"));
        assert!(out.ends_with("Goodbye!\n"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn replies_are_printed_and_recorded() {
        let mut session = session(vec![
            Ok(AssistantReply::text("Hello!")),
            Ok(AssistantReply::text("Sunny.")),
        ]);

        let out = run(&mut session, &["hi", "", "weather?", "exit"]).await;

        assert!(out.contains("Bot: Hello!\n"));
        assert!(out.contains("Bot: Sunny.\n"));
        assert_eq!(
            session.history().turns(),
            &[
                ChatTurn::user("hi"),
                ChatTurn::assistant("Hello!"),
                ChatTurn::user("weather?"),
                ChatTurn::assistant("Sunny."),
            ]
        );
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_skipped() {
        let mut session = session(vec![
            Ok(AssistantReply::text("first")),
            Err("provider unavailable".into()),
            Ok(AssistantReply::text("third")),
        ]);

        let out = run(&mut session, &["one", "two", "three"]).await;

        assert!(out.contains("An error occurred: provider unavailable\n"));
        assert!(out.contains("Please try again"));
        assert!(out.contains("Bot: third\n"));
        assert!(out.ends_with("Goodbye!\n"));

        let recorded: Vec<&str> =
            session.history().turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(recorded, vec!["one", "first", "three", "third"]);
    }

    #[tokio::test]
    async fn end_of_input_ends_session() {
        let mut session = session(vec![]);

        let out = run(&mut session, &[]).await;

        assert!(out.ends_with("Goodbye!\n"));
    }

    struct BrokenPrompter;

    impl Prompter for BrokenPrompter {
        fn read_line(&mut self) -> Result<Option<String>> {
            Err(anyhow::anyhow!("terminal closed"))
        }
    }

    #[tokio::test]
    async fn prompter_failure_ends_with_error() {
        let mut session = session(vec![]);
        let mut out = Vec::new();

        let err = session.run(&mut BrokenPrompter, &mut out).await.unwrap_err();

        assert!(format!("{err:#}").contains("terminal closed"));
    }
}
