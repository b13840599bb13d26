use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use crate::view_state::{FilterField, SortField};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(Self::handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) | (KeyCode::PageDown, _) => {
                Some(Message::NextPage)
            }
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) | (KeyCode::PageUp, _) => {
                Some(Message::PrevPage)
            }
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char(':'), _) => Some(Message::GotoPage),
            (KeyCode::Char('1'), _) => Some(Message::Sort(SortField::CreatedDt)),
            (KeyCode::Char('2'), _) => Some(Message::Sort(SortField::ModifiedDt)),
            (KeyCode::Char('3'), _) => Some(Message::Sort(SortField::LegalName)),
            (KeyCode::Char('s'), _) => Some(Message::CyclePageSize),
            (KeyCode::Char('e'), _) => Some(Message::Pick(FilterField::EntityType)),
            (KeyCode::Char('n'), _) => Some(Message::Pick(FilterField::LegalName)),
            (KeyCode::Char('d'), _) => Some(Message::Pick(FilterField::DbaName)),
            (KeyCode::Char('/'), _) => Some(Message::FilterContains),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
