use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::snake::Direction::{self, *};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    TogglePause,
    Start,
    Restart,
    Quit,
}

/// Maps a raw key press to a game command. Unknown keys yield `None`.
pub fn command_for(ev: &KeyEvent) -> Option<Command> {
    if is_ctrl_c(ev) {
        return Some(Command::Quit);
    }

    match ev.code {
        KeyCode::Char('w') | KeyCode::Up => Some(Command::Turn(Up)),
        KeyCode::Char('a') | KeyCode::Left => Some(Command::Turn(Left)),
        KeyCode::Char('s') | KeyCode::Down => Some(Command::Turn(Down)),
        KeyCode::Char('d') | KeyCode::Right => Some(Command::Turn(Right)),
        KeyCode::Char(' ') | KeyCode::Esc => Some(Command::TogglePause),
        KeyCode::Enter => Some(Command::Start),
        KeyCode::Char('r') => Some(Command::Restart),
        KeyCode::Char('q') => Some(Command::Quit),
        _ => None,
    }
}

pub fn is_ctrl_c(ev: &KeyEvent) -> bool {
    matches!(ev, KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn wasd_and_arrows_turn() {
        assert_eq!(command_for(&key(KeyCode::Char('w'))), Some(Command::Turn(Up)));
        assert_eq!(command_for(&key(KeyCode::Left)), Some(Command::Turn(Left)));
        assert_eq!(command_for(&key(KeyCode::Char('s'))), Some(Command::Turn(Down)));
        assert_eq!(command_for(&key(KeyCode::Right)), Some(Command::Turn(Right)));
    }

    #[test]
    fn control_keys() {
        assert_eq!(command_for(&key(KeyCode::Char(' '))), Some(Command::TogglePause));
        assert_eq!(command_for(&key(KeyCode::Enter)), Some(Command::Start));
        assert_eq!(command_for(&key(KeyCode::Char('r'))), Some(Command::Restart));
        assert_eq!(command_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Command::Quit));
        assert_eq!(command_for(&key(KeyCode::Char('x'))), None);
    }
}
