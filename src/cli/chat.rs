use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::agent::BookingAgent;
use crate::ai::tools::calendar_tools;
use crate::chat::ChatSession;
use crate::cli::calendar_from_config;
use crate::core::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let (calendar, zone) = calendar_from_config(config)?;
    let agent = BookingAgent::new(config, calendar_tools(calendar, zone.clone()), zone);
    let mut session = ChatSession::new(agent);

    for turn in session.history() {
        println!("{}\n", turn.content);
    }

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line) {
                    tracing::debug!("Unable to add history entry: {}", e);
                }
                let reply = session.send(line).await;
                println!("\n{}\n", reply.content);
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
