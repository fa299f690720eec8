//! Keyboard bindings for the preview window.

use nannou::prelude::*;

/// Actions that can be triggered by key presses
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Recalibrate,
    CancelCalibration,
    ToggleMirror,
    ToggleDebug,
    CycleMode,
    /// Switch capture to the device at this index (`--list-devices` order)
    SelectDevice(usize),
}

fn digit(key: Key) -> Option<usize> {
    let d = match key {
        Key::Key0 => 0,
        Key::Key1 => 1,
        Key::Key2 => 2,
        Key::Key3 => 3,
        Key::Key4 => 4,
        Key::Key5 => 5,
        Key::Key6 => 6,
        Key::Key7 => 7,
        Key::Key8 => 8,
        Key::Key9 => 9,
        _ => return None,
    };
    Some(d)
}

/// Parse a key into an action; shift adds 10 to device digits
pub fn parse_key(key: Key, shift: bool) -> Option<Action> {
    if let Some(d) = digit(key) {
        return Some(Action::SelectDevice(if shift { d + 10 } else { d }));
    }

    match key {
        Key::Q => Some(Action::Quit),
        Key::C => Some(Action::Recalibrate),
        Key::X | Key::Escape => Some(Action::CancelCalibration),
        Key::M => Some(Action::ToggleMirror),
        Key::D => Some(Action::ToggleDebug),
        Key::L => Some(Action::CycleMode),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_keys() {
        assert_eq!(parse_key(Key::C, false), Some(Action::Recalibrate));
        assert_eq!(parse_key(Key::X, false), Some(Action::CancelCalibration));
        assert_eq!(parse_key(Key::Escape, true), Some(Action::CancelCalibration));
    }

    #[test]
    fn test_device_digits() {
        assert_eq!(parse_key(Key::Key3, false), Some(Action::SelectDevice(3)));
        assert_eq!(parse_key(Key::Key3, true), Some(Action::SelectDevice(13)));
    }

    #[test]
    fn test_unbound_key() {
        assert_eq!(parse_key(Key::Z, false), None);
    }
}
