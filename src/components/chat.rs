use backdrop::editor::chat::{ChatMessage, ChatRole, ChatStatus, ChatState};
use backdrop::editor::upload::human_size;
use backdrop::editor::{session::EditorSession, tool::ToolMode};
use color_eyre::eyre::Result;
use ratatui::widgets::block::Title;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::styles::{
    ASSISTANT_COLOR, DISABLED_COLOR, ERROR_COLOR, FOCUSED_COLOR, SUCCESS_COLOR, USER_COLOR,
};
use crate::{layout::AppLayout, tui::Frame};

/// Transcript of the AI background tool, with the image waiting to be sent.
#[derive(Default)]
pub struct Conversation {}

impl Conversation {
    fn attachment_line(chat: &ChatState) -> Line<'static> {
        match &chat.image {
            Some(image) => Line::from(vec![
                Span::styled("Attached: ", Style::default().fg(Color::Gray)),
                Span::styled(image.name.clone(), Style::default().fg(Color::White).bold()),
                Span::styled(
                    format!(" ({}, {})", image.mime, human_size(image.size())),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            None => Line::from(Span::styled(
                "No image attached. Press o or paste a path to attach one.",
                Style::default().fg(DISABLED_COLOR),
            )),
        }
    }
}

/// Heading plus wrapped body of one transcript entry.
fn message_lines(message: &ChatMessage, width: usize) -> Vec<Line<'static>> {
    let mut spans = match message.role {
        ChatRole::User => vec![Span::styled("You", Style::default().fg(USER_COLOR).bold())],
        ChatRole::Assistant => vec![Span::styled(
            "Backdrop",
            Style::default().fg(ASSISTANT_COLOR).bold(),
        )],
    };

    let (status, color) = match message.status {
        ChatStatus::Pending => (Some("working..."), Color::Blue),
        ChatStatus::Failed => (Some("failed"), ERROR_COLOR),
        ChatStatus::Succeeded => (None, SUCCESS_COLOR),
    };
    if let Some(status) = status {
        spans.push(Span::raw(" - "));
        spans.push(Span::styled(status, Style::default().fg(color)));
    }

    let mut lines = vec![Line::from(spans)];
    for line in message.content.lines() {
        for wrapped in textwrap::wrap(line, width.max(1)) {
            lines.push(Line::from(Span::styled(
                wrapped.into_owned(),
                Style::default().fg(Color::White),
            )));
        }
    }
    if let Some(attachment) = &message.attachment {
        lines.push(Line::from(Span::styled(
            format!("[{attachment}]"),
            Style::default().fg(Color::Gray).italic(),
        )));
    }
    lines.push(Line::from(""));
    lines
}

impl Component for Conversation {
    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        if session.mode != ToolMode::AiBackground {
            return Ok(());
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(layout.body);

        let attachment = Paragraph::new(Conversation::attachment_line(&session.chat)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Thick)
                .style(Style::default().fg(FOCUSED_COLOR).bg(Color::Black)),
        );
        f.render_widget(attachment, chunks[0]);

        let width = chunks[1].width.saturating_sub(2) as usize;
        let items = session
            .chat
            .messages
            .values()
            .map(|message| ListItem::new(Text::from(message_lines(message, width))))
            .collect::<Vec<_>>();

        let empty = items.is_empty();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Title::from(" Conversation ").alignment(Alignment::Left))
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .style(Style::default().fg(FOCUSED_COLOR).bg(Color::Black)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
            .highlight_symbol("");

        if empty {
            let hint = Paragraph::new(Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Attach an image, describe a background and press Enter.",
                    Style::default().fg(Color::Gray),
                )),
            ]))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(Title::from(" Conversation ").alignment(Alignment::Left))
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .style(Style::default().fg(FOCUSED_COLOR).bg(Color::Black)),
            );
            f.render_widget(hint, chunks[1]);
            return Ok(());
        }

        let mut list_state = ListState::default().with_selected(session.chat.selected_message);
        f.render_stateful_widget(list, chunks[1], &mut list_state);
        Ok(())
    }
}
