//! Interactive conversation with the mixing advisor.

use console::style;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{analyze_loaded_clip, build_controller, print_analysis, user_facing};
use crate::ai::ChatRole;
use crate::config::AudiodeskConfig;
use crate::media::FileInput;
use crate::session::SessionError;

/// Runs the advisor prompt until `/quit` or end of input.
///
/// With `file`, the clip is analyzed first so its summary is part of the
/// conversation.
///
/// # Errors
/// - If the file cannot be loaded or analyzed
/// - If stdin cannot be read
pub async fn handle_chat(file: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("=== audiodesk Chat Command ===");

    let config = AudiodeskConfig::load()?;
    let controller = build_controller(&config)?;

    if let Some(path) = file {
        let input = FileInput::from_path(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        controller.import_file(Some(input)).await.map_err(user_facing)?;
        controller.wait_for_engine().await.map_err(user_facing)?;
        let result = analyze_loaded_clip(&controller).await?;
        print_analysis(&result);
    }

    for message in controller.snapshot().await.chat_history() {
        if message.role == ChatRole::Assistant {
            println!("{} {}", style("advisor>").cyan().bold(), message.text);
        }
    }
    eprintln!("{}", style("Ask about mixing or mastering. /quit to leave.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you>").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let line = line.trim();
        if matches!(line, "/quit" | "/exit") {
            break;
        }

        match controller.advise(line).await {
            Ok(reply) => println!("{} {}", style("advisor>").cyan().bold(), reply),
            Err(SessionError::EmptyMessage) => continue,
            Err(SessionError::Advisor(e)) => {
                tracing::error!("Advisor request failed: {e}");
                let transcript = controller.snapshot().await;
                if let Some(notice) = transcript.chat_history().last() {
                    println!("{} {}", style("advisor>").cyan().bold(), style(&notice.text).yellow());
                }
            }
            Err(e) => return Err(user_facing(e)),
        }
    }

    tracing::debug!("Chat closed");
    Ok(())
}
