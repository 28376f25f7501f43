use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use ai::{Agent, AiError, BackendFactory, ChatBackend, LLM, Runner};
use anyhow::Context;
use clap::Parser;
use config::{AgentMode, SqlAgentConfig};
use db::{Database, DatabaseOptions, SqliteDatabase};
use sqlagent::{agents, cli::Cli, repl};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut conf = match &cli.config {
        Some(path) => SqlAgentConfig::load(path)?,
        None => SqlAgentConfig::get_or_default(),
    };
    cli.apply(&mut conf);

    info!(
        database = %conf.database.path.display(),
        allow_writes = conf.database.allow_writes,
        mode = ?conf.agent.mode,
        "starting"
    );

    let database: Arc<dyn Database> = Arc::new(SqliteDatabase::new(
        DatabaseOptions::new(&conf.database.path).allow_writes(conf.database.allow_writes),
    ));

    let agent = match conf.agent.mode {
        AgentMode::Single => agents::single_agent(database, &conf.ai.model),
        AgentMode::Multi => agents::multi_agent(database, &conf.ai.model),
    };

    println!("Loading LLM...");
    let mut models = HashMap::new();
    for model_id in agent.model_ids() {
        let llm = LLM::load(&model_id)
            .await
            .with_context(|| format!("could not load model {model_id}"))?;
        models.insert(model_id, llm);
    }
    println!("Done!");

    let factory: Rc<BackendFactory> = Rc::new(
        move |agent: &Agent| -> Result<Box<dyn ChatBackend>, AiError> {
            let llm = models
                .get(&agent.model)
                .ok_or_else(|| AiError::UnknownModel(agent.model.clone()))?;
            Ok(Box::new(llm.session()))
        },
    );

    let mut runner = Runner::new(Arc::new(agent), factory, conf.agent.max_tool_rounds)?;

    match cli.prompt {
        Some(prompt) => {
            repl::ask(&mut runner, &prompt).await?;
        }
        None => repl::run(&mut runner).await?,
    }

    Ok(())
}
