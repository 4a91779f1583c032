use ratatui::style::Color;

pub(crate) const ACTIVE_COLOR: Color = Color::Yellow;
pub(crate) const FOCUSED_COLOR: Color = Color::LightBlue;
pub(crate) const UNFOCUSED_COLOR: Color = Color::Gray;

pub(crate) const USER_COLOR: Color = Color::Cyan;
pub(crate) const ASSISTANT_COLOR: Color = Color::LightMagenta;

pub(crate) const ERROR_COLOR: Color = Color::LightRed;
pub(crate) const SUCCESS_COLOR: Color = Color::LightGreen;
pub(crate) const DISABLED_COLOR: Color = Color::DarkGray;
