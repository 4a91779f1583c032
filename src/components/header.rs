use backdrop::editor::session::EditorSession;
use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::{config::Config, layout::AppLayout, styles::FOCUSED_COLOR, tui::Frame};

/// Title and tagline of the visible tool, plus the server in use.
#[derive(Default)]
pub struct Header {
    server: String,
}

impl Component for Header {
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.server = config.server.base_url;
        Ok(())
    }

    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        let mode = session.mode;
        let line = Line::from(vec![
            Span::styled(mode.title(), Style::default().fg(FOCUSED_COLOR).bold()),
            Span::raw("  "),
            Span::styled(mode.subtitle(), Style::default().fg(Color::Gray).italic()),
        ]);

        let paragraph = Paragraph::new(line).block(
            Block::default()
                .title(
                    block::Title::from(format!(" {} ", self.server)).alignment(Alignment::Right),
                )
                .borders(Borders::ALL)
                .border_type(BorderType::Thick)
                .style(Style::default().fg(Color::Gray).bg(Color::Black)),
        );
        f.render_widget(paragraph, layout.header);
        Ok(())
    }
}
