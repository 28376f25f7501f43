use std::io::{self, Write};

use ai::{AiError, RunEvent, Runner};
use colored::Colorize;

use crate::render;

pub async fn run(runner: &mut Runner) -> anyhow::Result<()> {
    cliclack::intro(format!("sqlagent: {}", runner.agent().name))?;

    loop {
        let prompt: String = match cliclack::input("You")
            .placeholder("Ask about your data, or type exit")
            .interact()
        {
            Ok(prompt) => prompt,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => break,
            Err(err) => return Err(err.into()),
        };

        let prompt = prompt.trim();
        if is_exit(prompt) {
            break;
        }

        if let Err(err) = ask(runner, prompt).await {
            eprintln!("{}", err.to_string().red());
        }
    }

    cliclack::outro("Bye")?;
    Ok(())
}

/// Streams the agent's work to stdout and returns its final answer.
pub async fn ask(runner: &mut Runner, prompt: &str) -> Result<String, AiError> {
    print!("\n{}", "[Assistant] ".blue());

    let reply = runner
        .ask(prompt, &mut |event: RunEvent| print_event(&event))
        .await;

    println!("\n");
    reply
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::Text { text, .. } => print!("{}", text.blue()),
        RunEvent::ToolCall { agent, call } => {
            println!(
                "\n{}",
                format!("[{agent}] {}({})", call.name, call.arguments).dimmed()
            );
        }
        RunEvent::ToolResult { result, .. } => {
            let rendered = render::tool_result(result);
            if result["status"] == "error" {
                println!("{}", rendered.red());
            } else {
                println!("{rendered}");
            }
        }
    }

    let _ = io::stdout().flush();
}

fn is_exit(prompt: &str) -> bool {
    prompt.is_empty() || matches!(prompt.to_lowercase().as_str(), "exit" | "quit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_end_the_session() {
        assert!(is_exit(""));
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit the ward table"));
    }
}
