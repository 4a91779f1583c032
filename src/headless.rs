use std::path::{Path, PathBuf};

use backdrop::editor::{
    api::EditService,
    download::save_blob,
    session::{EditorSession, MAX_BLUR_STRENGTH, MIN_BLUR_STRENGTH},
    tool::ToolMode,
};
use color_eyre::eyre::{eyre, Result};

use crate::cli::Command;
use crate::config::Config;

/// Runs one tool on one file, saving the result like the download button
/// would. Returns the saved path.
pub async fn run(command: Command, config: &Config, service: &dyn EditService) -> Result<PathBuf> {
    let mut session = EditorSession::new(config.blur.default_strength);
    let (tool, file, output) = match &command {
        Command::RemoveBg { file, output } => (ToolMode::RemoveBackground, file, output),
        Command::Blur { file, output, .. } => (ToolMode::Blur, file, output),
        Command::AiBackground { file, output, .. } => (ToolMode::AiBackground, file, output),
    };

    session.switch_mode(tool);
    match &command {
        Command::Blur {
            strength: Some(strength),
            ..
        } => session.blur_strength = (*strength).clamp(MIN_BLUR_STRENGTH, MAX_BLUR_STRENGTH),
        Command::AiBackground { prompt, .. } => session.set_prompt(prompt.as_str()),
        _ => {}
    }
    select(&mut session, file)?;

    let pending = session.begin_request()?;
    tracing::info!(tool = %tool, file = %file.display(), "running headless");
    let outcome = service.process(pending.request, pending.cancel).await;
    session.finish_request(pending.id, outcome);
    if let Some(error) = &session.error {
        return Err(eyre!("{error}"));
    }

    let dir = output.clone().unwrap_or_else(|| config.downloads.dir.clone());
    let (blob, name) = session.download_target()?;
    let path = save_blob(blob, &dir, name)?;
    tracing::info!(path = %path.display(), "saved result");
    Ok(path)
}

fn select(session: &mut EditorSession, file: &Path) -> Result<()> {
    if session.select_file(file) {
        return Ok(());
    }
    Err(eyre!(
        "{}: {}",
        file.display(),
        session.error.clone().unwrap_or_default()
    ))
}
