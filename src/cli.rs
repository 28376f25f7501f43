use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use config::{AgentMode, SqlAgentConfig};

#[derive(Debug, Parser)]
#[command(
    name = "sqlagent",
    about = "Ask questions about a SQLite database in plain language"
)]
pub struct Cli {
    /// Config file, instead of ~/.config/sqlagent/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    pub database: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Model id to load for every agent
    #[arg(long)]
    pub model: Option<String>,

    /// Open the database read-only; write statements fail
    #[arg(long)]
    pub read_only: bool,

    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Answer a single prompt and exit
    #[arg(long, short)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Single,
    Multi,
}

impl From<Mode> for AgentMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => AgentMode::Single,
            Mode::Multi => AgentMode::Multi,
        }
    }
}

impl Cli {
    /// Command line flags win over the config file.
    pub fn apply(&self, conf: &mut SqlAgentConfig) {
        if let Some(path) = &self.database {
            conf.database.path = path.clone();
        }
        if self.read_only {
            conf.database.allow_writes = false;
        }
        if let Some(mode) = self.mode {
            conf.agent.mode = mode.into();
        }
        if let Some(model) = &self.model {
            conf.ai.model = model.clone();
        }
        if let Some(rounds) = self.max_tool_rounds {
            conf.agent.max_tool_rounds = rounds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "sqlagent",
            "--database",
            "clinic.db",
            "--mode",
            "multi",
            "--model",
            "some/model",
            "--read-only",
            "--max-tool-rounds",
            "3",
        ])
        .unwrap();

        let mut conf = SqlAgentConfig::default();
        cli.apply(&mut conf);

        assert_eq!(conf.database.path, PathBuf::from("clinic.db"));
        assert!(!conf.database.allow_writes);
        assert_eq!(conf.agent.mode, AgentMode::Multi);
        assert_eq!(conf.ai.model, "some/model");
        assert_eq!(conf.agent.max_tool_rounds, 3);
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["sqlagent"]).unwrap();

        let mut conf = SqlAgentConfig::default();
        cli.apply(&mut conf);

        assert!(conf.database.allow_writes);
        assert_eq!(conf.agent.mode, AgentMode::Single);
        assert_eq!(conf.database.path, PathBuf::from("patient_records.db"));
    }

    #[test]
    fn one_shot_prompt() {
        let cli = Cli::try_parse_from(["sqlagent", "-p", "how many patients?"]).unwrap();

        assert_eq!(cli.prompt.as_deref(), Some("how many patients?"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["sqlagent", "--mode", "swarm"]).is_err());
    }
}
