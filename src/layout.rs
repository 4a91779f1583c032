use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions shared by every component.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppLayout {
    pub header: Rect,
    pub body: Rect,
    /// Zero height while no text input is on screen.
    pub input: Rect,
    pub status: Rect,
}

pub fn calculate_layout(area: Rect, show_input: bool) -> AppLayout {
    let input_height = if show_input { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .split(area);

    AppLayout {
        header: chunks[0],
        body: chunks[1],
        input: chunks[2],
        status: chunks[3],
    }
}
