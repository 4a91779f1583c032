use std::path::PathBuf;

use async_channel::Sender;
use backdrop::editor::{session::EditorSession, tool::ToolMode};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use directories::UserDirs;
use ratatui::widgets::block::Title;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::mode::Mode;
use crate::styles::{ACTIVE_COLOR, FOCUSED_COLOR, UNFOCUSED_COLOR};
use crate::{action::Action, layout::AppLayout, tui::Frame};

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
enum InputState {
    Focused,
    #[default]
    Unfocused,
    Active,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
enum InputPurpose {
    #[default]
    Path,
    Prompt,
}

/// Single line editor shared by the file picker and the chat prompt.
#[derive(Default)]
pub struct TextInput {
    command_tx: Option<Sender<Action>>,
    current_input: String,
    state: InputState,
    purpose: InputPurpose,
    tool: ToolMode,
}

impl TextInput {
    fn send(&self, action: Action) {
        if let Some(tx) = &self.command_tx {
            tx.try_send(action).ok();
        }
    }

    fn resting_purpose(&self) -> InputPurpose {
        match self.tool {
            ToolMode::AiBackground => InputPurpose::Prompt,
            _ => InputPurpose::Path,
        }
    }

    fn changed(&self) -> Option<Action> {
        match self.purpose {
            InputPurpose::Prompt => Some(Action::UpdatePrompt(self.current_input.clone())),
            InputPurpose::Path => None,
        }
    }

    fn submit(&mut self) -> Option<Action> {
        match self.purpose {
            InputPurpose::Path => {
                let path = clean_dropped_path(&self.current_input);
                self.current_input.clear();
                if path.as_os_str().is_empty() {
                    self.send(Action::SwitchMode(Mode::Tool));
                    return None;
                }
                Some(Action::SelectFile(path))
            }
            InputPurpose::Prompt => {
                self.send(Action::SwitchMode(Mode::Tool));
                Some(Action::Process)
            }
        }
    }
}

impl Component for TextInput {
    fn register_action_handler(&mut self, tx: Sender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.state != InputState::Active {
            return Ok(None);
        }

        let action = match key.code {
            KeyCode::Char(c) => {
                self.current_input.push(c);
                self.changed()
            }
            KeyCode::Backspace => {
                self.current_input.pop();
                self.changed()
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Esc => {
                if self.purpose == InputPurpose::Path {
                    self.current_input.clear();
                }
                Some(Action::SwitchMode(Mode::Tool))
            }
            _ => None,
        };
        Ok(action)
    }

    fn handle_paste(&mut self, text: String) -> Result<Option<Action>> {
        match self.state {
            InputState::Active => {
                self.current_input
                    .push_str(text.lines().next().unwrap_or_default());
                Ok(self.changed())
            }
            // A path dropped onto the terminal while a tool view has focus
            // counts as choosing that file.
            InputState::Focused => {
                let path = clean_dropped_path(&text);
                if path.as_os_str().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Action::SelectFile(path)))
                }
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::SwitchMode(mode) => match mode {
                Mode::PathInput => {
                    self.purpose = InputPurpose::Path;
                    self.state = InputState::Active;
                }
                Mode::PromptInput => {
                    self.purpose = InputPurpose::Prompt;
                    self.state = InputState::Active;
                }
                Mode::Tool => {
                    self.state = InputState::Focused;
                    self.purpose = self.resting_purpose();
                }
                Mode::Home => {
                    self.state = InputState::Unfocused;
                    self.tool = ToolMode::Home;
                    self.purpose = InputPurpose::Path;
                    self.current_input.clear();
                }
            },
            Action::SwitchTool(tool) => {
                self.current_input.clear();
                self.tool = tool;
                self.purpose = self.resting_purpose();
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        if layout.input.height == 0 {
            return Ok(());
        }

        // The session owns the prompt; keep the edit buffer in step with it
        // (it is cleared there once a prompt is sent).
        if self.purpose == InputPurpose::Prompt {
            self.current_input = session.chat.prompt.clone();
        }

        let title = match self.purpose {
            InputPurpose::Path => " Image path (Enter to select, Esc to cancel) ".to_string(),
            InputPurpose::Prompt if self.state == InputState::Active => {
                " Describe the new background (Enter to generate) ".to_string()
            }
            InputPurpose::Prompt => " Prompt (i to edit) ".to_string(),
        };

        let mut spans = vec![Span::styled(
            self.current_input.clone(),
            Style::default().fg(Color::White),
        )];
        if self.state == InputState::Active {
            spans.push(Span::styled("█", Style::default().fg(ACTIVE_COLOR)));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .title(Title::from(title).alignment(Alignment::Left))
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .style(
                        Style::default()
                            .fg(match self.state {
                                InputState::Active => ACTIVE_COLOR,
                                InputState::Focused => FOCUSED_COLOR,
                                InputState::Unfocused => UNFOCUSED_COLOR,
                            })
                            .bg(Color::Black),
                    ),
            )
            .alignment(Alignment::Left);
        f.render_widget(paragraph, layout.input);
        Ok(())
    }
}

/// Normalises a typed or dropped path: surrounding whitespace and quotes are
/// removed, shell escapes undone, `file://` and `~/` expanded.
pub fn clean_dropped_path(raw: &str) -> PathBuf {
    let mut path = raw.trim();
    for quote in ['\'', '"'] {
        if path.len() >= 2 && path.starts_with(quote) && path.ends_with(quote) {
            path = &path[1..path.len() - 1];
        }
    }
    let path = path.strip_prefix("file://").unwrap_or(path);
    let unescaped = path.replace("\\ ", " ");

    if let Some(rest) = unescaped.strip_prefix("~/") {
        if let Some(home) = UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(unescaped)
}
