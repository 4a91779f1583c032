use std::{sync::Arc, time::Duration};

use async_channel::Sender;
use backdrop::editor::{
    api::EditService, download::save_blob, session::EditorSession, tool::ToolMode,
};
use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::Rect;

use crate::{
    action::Action,
    components::{
        chat::Conversation, header::Header, home::ToolMenu, input::TextInput, status::StatusBar,
        workspace::Workspace, Component,
    },
    config::Config,
    layout::calculate_layout,
    mode::Mode,
    tui,
};

/// Quiet period after the last strength change before the blur is re-run.
const BLUR_REFRESH_DELAY: Duration = Duration::from_millis(300);

pub struct App {
    pub config: Config,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub components: Vec<Box<dyn Component>>,
    pub should_quit: bool,
    pub should_suspend: bool,
    pub mode: Mode,
    pub last_tick_key_events: Vec<KeyEvent>,
    pub session: EditorSession,
    service: Arc<dyn EditService>,
}

impl App {
    pub fn new(
        config: Config,
        service: Arc<dyn EditService>,
        tick_rate: f64,
        frame_rate: f64,
    ) -> Self {
        let session = EditorSession::new(config.blur.default_strength);
        Self {
            tick_rate,
            frame_rate,
            components: vec![
                Box::new(Header::default()),
                Box::new(ToolMenu::default()),
                Box::new(Workspace::default()),
                Box::new(Conversation::default()),
                Box::new(TextInput::default()),
                Box::new(StatusBar::default()),
            ],
            should_quit: false,
            should_suspend: false,
            config,
            mode: Mode::Home,
            last_tick_key_events: Vec::new(),
            session,
            service,
        }
    }

    fn show_input(&self) -> bool {
        self.mode.is_input() || self.session.mode == ToolMode::AiBackground
    }

    fn render(&mut self, tui: &mut tui::Tui, action_tx: &Sender<Action>) -> Result<()> {
        let show_input = self.show_input();
        let session = &self.session;
        let components = &mut self.components;
        tui.draw(|f| {
            let layout = calculate_layout(f.size(), show_input);
            for component in components.iter_mut() {
                if let Err(e) = component.draw(f, &layout, session) {
                    action_tx
                        .try_send(Action::Error(format!("Failed to draw: {:?}", e)))
                        .ok();
                }
            }
        })?;
        Ok(())
    }

    pub async fn run(&mut self) -> Result<()> {
        let (action_tx, action_rx) = async_channel::unbounded();

        let mut tui = tui::Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate);
        tui.enter()?;

        for component in self.components.iter_mut() {
            component.register_action_handler(action_tx.clone())?;
        }

        for component in self.components.iter_mut() {
            component.register_config_handler(self.config.clone())?;
        }

        for component in self.components.iter_mut() {
            component.init(tui.size()?)?;
        }

        loop {
            if let Some(e) = tui.next().await {
                match e {
                    tui::Event::Tick => action_tx.send(Action::Tick).await?,
                    tui::Event::Render => action_tx.send(Action::Render).await?,
                    tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y)).await?,
                    tui::Event::Error => {
                        action_tx
                            .send(Action::Error("Failed to read terminal input.".to_string()))
                            .await?
                    }
                    tui::Event::Key(key) => {
                        if let Some(keymap) = self.config.keybindings.get(&self.mode) {
                            if let Some(action) = keymap.get(&vec![key]) {
                                tracing::info!("Got action: {action:?}");
                                action_tx.send(action.clone()).await?;
                            } else {
                                // If the key was not handled as a single key action,
                                // then consider it for multi-key combinations.
                                self.last_tick_key_events.push(key);

                                if let Some(action) = keymap.get(&self.last_tick_key_events) {
                                    tracing::info!("Got action: {action:?}");
                                    action_tx.send(action.clone()).await?;
                                }
                            }
                        };
                    }
                    _ => {}
                }
                for component in self.components.iter_mut() {
                    if let Some(action) = component.handle_events(Some(e.clone()))? {
                        action_tx.send(action).await?;
                    }
                }
            }

            while let Ok(action) = action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    tracing::debug!("{action:?}");
                }
                match action.clone() {
                    Action::Tick => {
                        self.last_tick_key_events.drain(..);
                    }
                    Action::Quit => self.should_quit = true,
                    Action::Suspend => self.should_suspend = true,
                    Action::Resume => self.should_suspend = false,
                    Action::Resize(w, h) => {
                        tui.resize(Rect::new(0, 0, w, h))?;
                        self.render(&mut tui, &action_tx)?;
                    }
                    Action::Render => self.render(&mut tui, &action_tx)?,
                    other => self.dispatch(other, &action_tx)?,
                }
                for component in self.components.iter_mut() {
                    if let Some(action) = component.update(action.clone())? {
                        action_tx.send(action).await?
                    };
                }
            }
            if self.should_suspend {
                tui.suspend()?;
                action_tx.send(Action::Resume).await?;
                tui = tui::Tui::new()?
                    .tick_rate(self.tick_rate)
                    .frame_rate(self.frame_rate);
                tui.enter()?;
            } else if self.should_quit {
                self.session.cancel_request();
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        Ok(())
    }

    /// Moves the strength and, once it stops moving, re-runs the blur with
    /// the cached cutout. Only the last change in a burst reaches the server.
    fn schedule_blur_refresh(&mut self, delta: i16, action_tx: &Sender<Action>) {
        if !self.session.adjust_blur(delta) || self.session.subject_cutout.is_none() {
            return;
        }
        let revision = self.session.blur_revision();
        let tx = action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(BLUR_REFRESH_DELAY).await;
            tx.send(Action::RefreshBlur(revision)).await.ok();
        });
    }

    /// Applies an editor action to the session. Follow-up actions go out on
    /// `action_tx`; uploads run on their own task and report back with
    /// [`Action::ProcessFinished`].
    pub fn dispatch(&mut self, action: Action, action_tx: &Sender<Action>) -> Result<()> {
        match action {
            Action::SwitchMode(mode) => self.mode = mode,
            Action::SwitchTool(tool) => {
                self.session.switch_mode(tool);
                let mode = if tool.is_tool() { Mode::Tool } else { Mode::Home };
                action_tx.try_send(Action::SwitchMode(mode))?;
            }
            Action::Back => {
                if self.session.is_processing() {
                    self.session.cancel_request();
                } else if self.mode == Mode::Tool {
                    action_tx.try_send(Action::SwitchTool(ToolMode::Home))?;
                }
            }
            Action::OpenFilePicker => {
                if self.session.mode.is_tool() {
                    action_tx.try_send(Action::SwitchMode(Mode::PathInput))?;
                }
            }
            Action::EditPrompt => {
                if self.session.mode == ToolMode::AiBackground {
                    action_tx.try_send(Action::SwitchMode(Mode::PromptInput))?;
                }
            }
            Action::SelectFile(path) => {
                if !self.session.mode.is_tool() {
                    return Ok(());
                }
                let accepted = self.session.select_file(&path);
                let next = if accepted
                    && self.session.mode == ToolMode::AiBackground
                    && self.session.chat.prompt.trim().is_empty()
                {
                    Mode::PromptInput
                } else {
                    Mode::Tool
                };
                action_tx.try_send(Action::SwitchMode(next))?;
            }
            Action::UpdatePrompt(prompt) => self.session.set_prompt(prompt),
            Action::Process => match self.session.begin_request() {
                Ok(pending) => {
                    let service = self.service.clone();
                    let tx = action_tx.clone();
                    tokio::spawn(async move {
                        let outcome = service.process(pending.request, pending.cancel).await;
                        tx.send(Action::ProcessFinished(pending.id, outcome)).await.ok();
                    });
                }
                Err(err) => self.session.fail(err.to_string()),
            },
            Action::ProcessFinished(id, outcome) => {
                self.session.finish_request(id, outcome);
                if self.session.needs_blur_refresh() {
                    action_tx.try_send(Action::RefreshBlur(self.session.blur_revision()))?;
                }
            }
            Action::Cancel => self.session.cancel_request(),
            Action::Download => {
                let dir = self.config.downloads.dir.clone();
                let saved = self
                    .session
                    .download_target()
                    .and_then(|(blob, name)| save_blob(blob, &dir, name));
                match saved {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "saved result");
                        self.session.record_saved(path);
                    }
                    Err(err) => self.session.fail(err.to_string()),
                }
            }
            Action::CopySavedPath => {
                if let Some(path) = &self.session.saved_path {
                    let text = path.display().to_string();
                    let copied = arboard::Clipboard::new().and_then(|mut c| c.set_text(text));
                    if let Err(err) = copied {
                        self.session.fail(format!("Could not copy to the clipboard: {err}"));
                    }
                }
            }
            Action::IncreaseBlur if self.session.mode == ToolMode::Blur => {
                self.schedule_blur_refresh(1, action_tx)
            }
            Action::DecreaseBlur if self.session.mode == ToolMode::Blur => {
                self.schedule_blur_refresh(-1, action_tx)
            }
            Action::RefreshBlur(revision) => {
                if revision == self.session.blur_revision() && self.session.needs_blur_refresh() {
                    tracing::debug!(strength = self.session.blur_strength, "refreshing blur");
                    self.dispatch(Action::Process, action_tx)?;
                }
            }
            Action::SelectNextMessage => self.session.chat.select_next_message(),
            Action::SelectPreviousMessage => self.session.chat.select_prev_message(),
            Action::ClearError => self.session.clear_error(),
            Action::Error(message) => {
                tracing::error!("{message}");
                self.session.fail(message);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_channel::Receiver;
    use async_trait::async_trait;
    use backdrop::editor::api::{ApiError, ImageBlob};
    use backdrop::editor::upload::ImageFile;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[derive(Default)]
    struct StubService {
        calls: Mutex<Vec<String>>,
    }

    impl StubService {
        fn answer(&self, call: String) -> Result<ImageBlob, ApiError> {
            self.calls.lock().unwrap().push(call);
            Ok(ImageBlob::new(PNG.to_vec(), "image/png"))
        }
    }

    #[async_trait]
    impl EditService for StubService {
        async fn remove_background(
            &self,
            image: &ImageFile,
            _cancel: &CancellationToken,
        ) -> Result<ImageBlob, ApiError> {
            self.answer(format!("remove-bg {}", image.name))
        }

        async fn blur_background(
            &self,
            original: &ImageFile,
            _subject: &ImageBlob,
            strength: u8,
            _cancel: &CancellationToken,
        ) -> Result<ImageBlob, ApiError> {
            self.answer(format!("blur {} {strength}", original.name))
        }

        async fn ai_background(
            &self,
            image: &ImageFile,
            prompt: &str,
            _cancel: &CancellationToken,
        ) -> Result<ImageBlob, ApiError> {
            self.answer(format!("ai {} {prompt}", image.name))
        }
    }

    fn app(downloads: &Path) -> (App, Arc<StubService>) {
        let service = Arc::new(StubService::default());
        let mut config = Config::default();
        config.downloads.dir = downloads.to_path_buf();
        config.blur.default_strength = 5;
        (App::new(config, service.clone(), 4.0, 30.0), service)
    }

    fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, PNG).unwrap();
        path
    }

    /// Feeds queued actions back through `dispatch`, the way the run loop does.
    fn drain(app: &mut App, tx: &Sender<Action>, rx: &Receiver<Action>) -> Vec<Action> {
        let mut seen = Vec::new();
        while let Ok(action) = rx.try_recv() {
            seen.push(action.clone());
            app.dispatch(action, tx).unwrap();
        }
        seen
    }

    #[tokio::test]
    async fn opening_a_tool_focuses_it() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        let (tx, rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::Blur), &tx).unwrap();
        drain(&mut app, &tx, &rx);

        assert_eq!(app.session.mode, ToolMode::Blur);
        assert_eq!(app.mode, Mode::Tool);

        app.dispatch(Action::Back, &tx).unwrap();
        drain(&mut app, &tx, &rx);
        assert_eq!(app.session.mode, ToolMode::Home);
        assert_eq!(app.mode, Mode::Home);
    }

    #[tokio::test]
    async fn processing_without_a_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, service) = app(dir.path());
        let (tx, _rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::RemoveBackground), &tx)
            .unwrap();
        app.dispatch(Action::Process, &tx).unwrap();

        assert_eq!(
            app.session.error.as_deref(),
            Some("Please select an image first.")
        );
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_background_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        let (mut app, service) = app(&downloads);
        let (tx, rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::RemoveBackground), &tx)
            .unwrap();
        let path = write_png(dir.path(), "cat.png");
        app.dispatch(Action::SelectFile(path), &tx).unwrap();
        drain(&mut app, &tx, &rx);
        assert!(app.session.can_process());

        app.dispatch(Action::Process, &tx).unwrap();
        assert!(app.session.is_processing());

        let finished = rx.recv().await.unwrap();
        assert!(matches!(finished, Action::ProcessFinished(_, Ok(_))));
        app.dispatch(finished, &tx).unwrap();
        assert!(app.session.result.is_some());
        assert_eq!(*service.calls.lock().unwrap(), vec!["remove-bg cat.png"]);

        app.dispatch(Action::Download, &tx).unwrap();
        app.dispatch(Action::Download, &tx).unwrap();
        assert_eq!(
            app.session.saved_path,
            Some(downloads.join("cat-no-bg-1.png"))
        );
        assert!(downloads.join("cat-no-bg.png").exists());
    }

    #[tokio::test]
    async fn download_without_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        let (tx, _rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::Blur), &tx).unwrap();
        app.dispatch(Action::Download, &tx).unwrap();

        assert_eq!(
            app.session.error.as_deref(),
            Some("There is no result to download yet.")
        );
    }

    #[tokio::test]
    async fn blur_strength_only_moves_in_blur_tool() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        let (tx, _rx) = async_channel::unbounded();

        app.dispatch(Action::IncreaseBlur, &tx).unwrap();
        assert_eq!(app.session.blur_strength, 5);

        app.dispatch(Action::SwitchTool(ToolMode::Blur), &tx).unwrap();
        app.dispatch(Action::IncreaseBlur, &tx).unwrap();
        app.dispatch(Action::IncreaseBlur, &tx).unwrap();
        app.dispatch(Action::DecreaseBlur, &tx).unwrap();
        assert_eq!(app.session.blur_strength, 6);
    }

    #[tokio::test]
    async fn attaching_chat_image_moves_to_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, service) = app(dir.path());
        let (tx, rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::AiBackground), &tx)
            .unwrap();
        drain(&mut app, &tx, &rx);
        assert!(app.show_input());

        let path = write_png(dir.path(), "me.png");
        app.dispatch(Action::SelectFile(path), &tx).unwrap();
        drain(&mut app, &tx, &rx);
        assert_eq!(app.mode, Mode::PromptInput);

        app.dispatch(Action::UpdatePrompt("a beach".to_string()), &tx)
            .unwrap();
        app.dispatch(Action::Process, &tx).unwrap();
        let finished = rx.recv().await.unwrap();
        app.dispatch(finished, &tx).unwrap();

        assert_eq!(*service.calls.lock().unwrap(), vec!["ai me.png a beach"]);
        assert_eq!(app.session.chat.messages.len(), 5);
        assert!(app.session.chat.image.is_none());
    }

    #[tokio::test]
    async fn rejected_file_stays_in_tool_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app(dir.path());
        let (tx, rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::RemoveBackground), &tx)
            .unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        app.dispatch(Action::SelectFile(path), &tx).unwrap();
        drain(&mut app, &tx, &rx);

        assert_eq!(app.mode, Mode::Tool);
        assert_eq!(
            app.session.error.as_deref(),
            Some("Please select a valid image file (JPG or PNG).")
        );
        app.dispatch(Action::ClearError, &tx).unwrap();
        assert!(app.session.error.is_none());
    }

    /// Dispatches incoming actions until an upload reports back.
    async fn until_finished(app: &mut App, tx: &Sender<Action>, rx: &Receiver<Action>) {
        loop {
            let action = rx.recv().await.unwrap();
            let finished = matches!(action, Action::ProcessFinished(..));
            app.dispatch(action, tx).unwrap();
            if finished {
                break;
            }
        }
    }

    /// A blur tool with `name` selected and its first upload under way.
    async fn blurred(
        dir: &Path,
        name: &str,
    ) -> (App, Arc<StubService>, Sender<Action>, Receiver<Action>) {
        let (mut app, service) = app(dir);
        let (tx, rx) = async_channel::unbounded();
        app.dispatch(Action::SwitchTool(ToolMode::Blur), &tx).unwrap();
        app.dispatch(Action::SelectFile(write_png(dir, name)), &tx)
            .unwrap();
        drain(&mut app, &tx, &rx);
        app.dispatch(Action::Process, &tx).unwrap();
        (app, service, tx, rx)
    }

    #[tokio::test]
    async fn choosing_another_file_while_processing_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, tx, rx) = blurred(dir.path(), "a.png").await;

        let other = write_png(dir.path(), "b.png");
        app.dispatch(Action::SelectFile(other), &tx).unwrap();
        assert_eq!(
            app.session.error.as_deref(),
            Some("Still working on the previous image.")
        );
        assert_eq!(app.session.selected_file.as_ref().unwrap().name, "a.png");

        until_finished(&mut app, &tx, &rx).await;
        assert_eq!(app.session.download_target().unwrap().1, "a-blurred.png");
    }

    #[tokio::test]
    async fn strength_change_reruns_blur_once_it_settles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, service, tx, rx) = blurred(dir.path(), "cat.png").await;
        until_finished(&mut app, &tx, &rx).await;
        assert!(app.session.result.is_some());

        app.dispatch(Action::IncreaseBlur, &tx).unwrap();
        app.dispatch(Action::IncreaseBlur, &tx).unwrap();
        assert!(app.session.result.is_none());
        assert!(app.session.download_target().is_err());

        until_finished(&mut app, &tx, &rx).await;

        assert_eq!(
            *service.calls.lock().unwrap(),
            vec!["remove-bg cat.png", "blur cat.png 5", "blur cat.png 7"]
        );
        assert!(app.session.result.is_some());
        assert_eq!(app.session.download_target().unwrap().1, "cat-blurred.png");
    }

    #[tokio::test]
    async fn strength_change_before_any_result_waits_for_process() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, service) = app(dir.path());
        let (tx, rx) = async_channel::unbounded();

        app.dispatch(Action::SwitchTool(ToolMode::Blur), &tx).unwrap();
        app.dispatch(Action::SelectFile(write_png(dir.path(), "cat.png")), &tx)
            .unwrap();
        drain(&mut app, &tx, &rx);
        app.dispatch(Action::IncreaseBlur, &tx).unwrap();

        tokio::time::sleep(BLUR_REFRESH_DELAY * 2).await;
        drain(&mut app, &tx, &rx);
        assert!(service.calls.lock().unwrap().is_empty());
        assert!(!app.session.is_processing());
    }
}
