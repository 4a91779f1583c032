use backdrop::editor::{session::EditorSession, tool::ToolMode};
use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::mode::Mode;
use crate::styles::{ERROR_COLOR, UNFOCUSED_COLOR};
use crate::{action::Action, layout::AppLayout, tui::Frame};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Bottom line: the current error if there is one, key hints otherwise.
#[derive(Default)]
pub struct StatusBar {
    mode: Mode,
    frame: usize,
}

fn hints(mode: Mode, tool: ToolMode) -> &'static str {
    match (mode, tool) {
        (Mode::PathInput, _) => "enter select · esc cancel",
        (Mode::PromptInput, _) => "enter generate · esc done",
        (_, ToolMode::Home) => "j/k move · enter open · 1-3 jump · q quit",
        (_, ToolMode::RemoveBackground) => {
            "o open · enter process · d download · esc back · q quit"
        }
        (_, ToolMode::Blur) => {
            "o open · h/l strength · enter process · d download · esc back · q quit"
        }
        (_, ToolMode::AiBackground) => {
            "o attach · i prompt · enter generate · j/k messages · d download · esc back"
        }
    }
}

impl Component for StatusBar {
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => self.frame = (self.frame + 1) % SPINNER.len(),
            Action::SwitchMode(mode) => self.mode = mode,
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        let mut spans = Vec::new();
        if session.is_processing() {
            spans.push(Span::styled(
                format!("{} ", SPINNER[self.frame]),
                Style::default().fg(Color::Blue),
            ));
        }

        match &session.error {
            Some(error) => {
                spans.push(Span::styled(
                    error.clone(),
                    Style::default().fg(ERROR_COLOR).bold(),
                ));
                spans.push(Span::styled(
                    "  (c to dismiss)",
                    Style::default().fg(UNFOCUSED_COLOR),
                ));
            }
            None => spans.push(Span::styled(
                hints(self.mode, session.mode),
                Style::default().fg(UNFOCUSED_COLOR),
            )),
        }

        f.render_widget(Paragraph::new(Line::from(spans)), layout.status);
        Ok(())
    }
}
