use backdrop::editor::session::{EditorSession, MAX_BLUR_STRENGTH};
use backdrop::editor::tool::ToolMode;
use backdrop::editor::upload::human_size;
use color_eyre::eyre::Result;
use ratatui::widgets::block::Title;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::styles::{ACTIVE_COLOR, DISABLED_COLOR, FOCUSED_COLOR, SUCCESS_COLOR};
use crate::{layout::AppLayout, tui::Frame};

/// Upload, settings and result panels of the remove and blur tools.
#[derive(Default)]
pub struct Workspace {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Button {
    Ready(&'static str),
    Disabled(&'static str),
    Busy,
}

fn button(session: &EditorSession) -> Button {
    if session.is_processing() {
        Button::Busy
    } else if session.can_process() {
        Button::Ready(session.mode.action_label())
    } else {
        Button::Disabled(session.mode.action_label())
    }
}

fn panel(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(Title::from(title).alignment(Alignment::Left))
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .style(Style::default().fg(color).bg(Color::Black))
}

impl Workspace {
    fn draw_source(&self, f: &mut Frame<'_>, area: Rect, session: &EditorSession) {
        let lines = match &session.selected_file {
            Some(file) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        file.name.clone(),
                        Style::default().fg(Color::White).bold(),
                    )),
                    Line::from(Span::styled(
                        format!("{} · {}", file.mime, human_size(file.size())),
                        Style::default().fg(Color::Gray),
                    )),
                ];
                if let Some(path) = &file.path {
                    lines.push(Line::from(Span::styled(
                        path.display().to_string(),
                        Style::default().fg(DISABLED_COLOR),
                    )));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Press o or paste another path to replace it.",
                    Style::default().fg(Color::Gray),
                )));
                lines
            }
            None => vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No image selected",
                    Style::default().fg(Color::White),
                )),
                Line::from(Span::styled(
                    "Press o to type a path, or drop a file onto the terminal.",
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::styled(
                    "Images up to 10MB.",
                    Style::default().fg(DISABLED_COLOR),
                )),
            ],
        };

        let paragraph = Paragraph::new(Text::from(lines))
            .block(panel(" Image ", FOCUSED_COLOR))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn draw_blur(&self, f: &mut Frame<'_>, area: Rect, session: &EditorSession) {
        let gauge = Gauge::default()
            .block(panel(" Blur strength (h/l) ", FOCUSED_COLOR))
            .gauge_style(Style::default().fg(ACTIVE_COLOR).bg(Color::Black))
            .ratio(session.blur_strength as f64 / MAX_BLUR_STRENGTH as f64)
            .label(format!("{}", session.blur_strength));
        f.render_widget(gauge, area);
    }

    fn draw_button(&self, f: &mut Frame<'_>, area: Rect, session: &EditorSession) {
        let (text, color) = match button(session) {
            Button::Ready(label) => (format!("[ {label} ]  Enter"), ACTIVE_COLOR),
            Button::Disabled(label) => (format!("[ {label} ]"), DISABLED_COLOR),
            Button::Busy => ("Processing... (Esc to cancel)".to_string(), Color::Blue),
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(color).bold(),
        )))
        .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
    }

    fn draw_result(&self, f: &mut Frame<'_>, area: Rect, session: &EditorSession) {
        let lines = match &session.result {
            Some(result) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        "Done!",
                        Style::default().fg(SUCCESS_COLOR).bold(),
                    )),
                    Line::from(Span::styled(result.summary(), Style::default().fg(Color::White))),
                ];
                if session.subject_cutout.is_some() && session.mode == ToolMode::Blur {
                    lines.push(Line::from(Span::styled(
                        "h/l re-blurs without removing the background again.",
                        Style::default().fg(Color::Gray),
                    )));
                }
                lines.push(Line::from(""));
                match &session.saved_path {
                    Some(path) => {
                        lines.push(Line::from(vec![
                            Span::styled("Saved to ", Style::default().fg(Color::Gray)),
                            Span::styled(
                                path.display().to_string(),
                                Style::default().fg(SUCCESS_COLOR),
                            ),
                        ]));
                        lines.push(Line::from(Span::styled(
                            "y copies the path.",
                            Style::default().fg(Color::Gray),
                        )));
                    }
                    None => lines.push(Line::from(Span::styled(
                        "Press d to download.",
                        Style::default().fg(ACTIVE_COLOR),
                    ))),
                }
                lines
            }
            None if session.is_processing() => vec![Line::from(Span::styled(
                "Working on it...",
                Style::default().fg(Color::Blue),
            ))],
            None if session.needs_blur_refresh() => vec![Line::from(Span::styled(
                format!("Updating blur to {}...", session.blur_strength),
                Style::default().fg(Color::Blue),
            ))],
            None => vec![Line::from(Span::styled(
                "The result will appear here.",
                Style::default().fg(DISABLED_COLOR),
            ))],
        };

        let paragraph = Paragraph::new(Text::from(lines))
            .block(panel(" Result ", FOCUSED_COLOR))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }
}

impl Component for Workspace {
    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        if !matches!(session.mode, ToolMode::RemoveBackground | ToolMode::Blur) {
            return Ok(());
        }

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout.body);

        let blur_height = if session.mode == ToolMode::Blur { 3 } else { 0 };
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(blur_height),
                Constraint::Length(1),
            ])
            .split(columns[0]);

        self.draw_source(f, left[0], session);
        if blur_height > 0 {
            self.draw_blur(f, left[1], session);
        }
        self.draw_button(f, left[2], session);
        self.draw_result(f, columns[1], session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop::editor::upload::ImageFile;
    use pretty_assertions::assert_eq;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn button_follows_session() {
        let mut session = EditorSession::default();
        session.switch_mode(ToolMode::Blur);
        assert_eq!(button(&session), Button::Disabled("Apply Blur"));

        session
            .attach(ImageFile::from_bytes("cat.png", PNG.to_vec()).unwrap())
            .unwrap();
        assert_eq!(button(&session), Button::Ready("Apply Blur"));

        session.begin_request().unwrap();
        assert_eq!(button(&session), Button::Busy);
    }
}
