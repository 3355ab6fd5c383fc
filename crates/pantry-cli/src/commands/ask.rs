//! `pantry ask`: one question through the full engine, progress streamed
//! to the terminal.

use anyhow::Result;

use pantry_core::config::PantryConfig;
use pantry_core::event::EventKind;

use super::utils::build_engine;

pub async fn run(config: &PantryConfig, session: &str, question: &str) -> Result<()> {
    let engine = build_engine(config).await?;
    let mut stream = engine.handle_query(session, question).await;

    while let Some(event) = stream.recv().await {
        match event.kind {
            EventKind::Progress => {
                eprintln!("  -> {} [{}]", event.step_description, event.node_name);
            }
            EventKind::Final => {
                println!("{}", event.step_description);
                break;
            }
            EventKind::Error => {
                eprintln!("error: {}", event.step_description);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
