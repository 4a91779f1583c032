use async_channel::Sender;
use backdrop::editor::session::EditorSession;
use color_eyre::eyre::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

use crate::{
    action::Action,
    config::Config,
    layout::AppLayout,
    tui::{Event, Frame},
};

pub mod chat;
pub mod header;
pub mod home;
pub mod input;
pub mod status;
pub mod workspace;

/// A piece of the screen. Components react to actions and draw themselves
/// into their region of the shared layout; all editor state lives in the
/// session they are handed.
pub trait Component {
    #[allow(unused_variables)]
    fn register_action_handler(&mut self, tx: Sender<Action>) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn init(&mut self, area: Rect) -> Result<()> {
        Ok(())
    }

    fn handle_events(&mut self, event: Option<Event>) -> Result<Option<Action>> {
        let r = match event {
            Some(Event::Key(key_event)) => self.handle_key_events(key_event)?,
            Some(Event::Mouse(mouse_event)) => self.handle_mouse_events(mouse_event)?,
            Some(Event::Paste(text)) => self.handle_paste(text)?,
            _ => None,
        };
        Ok(r)
    }

    #[allow(unused_variables)]
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    #[allow(unused_variables)]
    fn handle_mouse_events(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    #[allow(unused_variables)]
    fn handle_paste(&mut self, text: String) -> Result<Option<Action>> {
        Ok(None)
    }

    #[allow(unused_variables)]
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, layout: &AppLayout, session: &EditorSession)
        -> Result<()>;
}
