use backdrop::editor::{session::EditorSession, tool::ToolMode};
use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};
use strum::IntoEnumIterator;

use super::Component;
use crate::{
    action::Action,
    layout::AppLayout,
    styles::{ACTIVE_COLOR, FOCUSED_COLOR},
    tui::Frame,
};

/// The landing view: a menu of the available tools.
pub struct ToolMenu {
    tools: Vec<ToolMode>,
    selected: usize,
}

impl Default for ToolMenu {
    fn default() -> Self {
        ToolMenu {
            tools: ToolMode::iter().filter(ToolMode::is_tool).collect(),
            selected: 0,
        }
    }
}

impl ToolMenu {
    fn select_next(&mut self) {
        if self.selected + 1 < self.tools.len() {
            self.selected += 1;
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn selected_tool(&self) -> Option<ToolMode> {
        self.tools.get(self.selected).copied()
    }
}

impl Component for ToolMenu {
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::SelectNextTool => self.select_next(),
            Action::SelectPreviousTool => self.select_previous(),
            Action::OpenSelectedTool => return Ok(self.selected_tool().map(Action::SwitchTool)),
            Action::SwitchTool(tool) => {
                if let Some(index) = self.tools.iter().position(|t| *t == tool) {
                    self.selected = index;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession) -> Result<()> {
        if session.mode != ToolMode::Home {
            return Ok(());
        }

        let items = self
            .tools
            .iter()
            .enumerate()
            .map(|(index, tool)| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(format!(" {} ", index + 1), Style::default().fg(ACTIVE_COLOR)),
                        Span::styled(tool.title(), Style::default().fg(Color::White).bold()),
                    ]),
                    Line::from(Span::styled(
                        format!("    {}", tool.subtitle()),
                        Style::default().fg(Color::Gray),
                    )),
                    Line::from(""),
                ])
            })
            .collect::<Vec<_>>();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Tools ")
                    .title_alignment(Alignment::Left)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .style(Style::default().fg(FOCUSED_COLOR).bg(Color::Black)),
            )
            .highlight_style(
                Style::default()
                    .add_modifier(Modifier::ITALIC)
                    .bg(Color::DarkGray),
            )
            .highlight_symbol("");

        let mut list_state = ListState::default().with_selected(Some(self.selected));
        f.render_stateful_widget(list, layout.body, &mut list_state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_only_real_tools() {
        let menu = ToolMenu::default();
        assert_eq!(
            menu.tools,
            vec![
                ToolMode::RemoveBackground,
                ToolMode::Blur,
                ToolMode::AiBackground
            ]
        );
    }

    #[test]
    fn opening_emits_switch_for_selection() {
        let mut menu = ToolMenu::default();
        menu.update(Action::SelectNextTool).unwrap();
        menu.update(Action::SelectNextTool).unwrap();
        menu.update(Action::SelectNextTool).unwrap();

        assert_eq!(
            menu.update(Action::OpenSelectedTool).unwrap(),
            Some(Action::SwitchTool(ToolMode::AiBackground))
        );

        menu.update(Action::SelectPreviousTool).unwrap();
        menu.update(Action::SelectPreviousTool).unwrap();
        menu.update(Action::SelectPreviousTool).unwrap();
        assert_eq!(menu.selected, 0);
    }
}
