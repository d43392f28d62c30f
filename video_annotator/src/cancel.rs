//! User-requested early termination.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Polled once per frame by the processing loop.
pub trait CancelSignal {
    /// Non-blocking. `true` once the user asked to stop.
    fn cancel_requested(&mut self) -> bool;
}

/// Fires when `q`, `Q`, `Esc` or `Ctrl+C` is pressed on the controlling
/// terminal.
///
/// The terminal is switched to raw mode for the lifetime of this value so a
/// single keypress is seen without Enter and is not echoed. Dropping it
/// restores the previous mode.
#[derive(Debug)]
pub struct KeyboardCancel {
    raw_mode: bool,
    /// Set once the terminal could not be used; no further attempts.
    unavailable: bool,
}

impl KeyboardCancel {
    pub fn new() -> Self {
        match terminal::enable_raw_mode() {
            Ok(()) => Self {
                raw_mode: true,
                unavailable: false,
            },
            Err(err) => {
                log::warn!("No interactive terminal, cancelling with q/Esc is disabled: {err}");
                Self {
                    raw_mode: false,
                    unavailable: true,
                }
            }
        }
    }
}

impl CancelSignal for KeyboardCancel {
    fn cancel_requested(&mut self) -> bool {
        if self.unavailable {
            return false;
        }
        match drain_for_quit() {
            Ok(quit) => quit,
            Err(err) => {
                log::warn!("Keyboard input unavailable, cancelling with q/Esc is disabled: {err}");
                self.unavailable = true;
                false
            }
        }
    }
}

impl Drop for KeyboardCancel {
    fn drop(&mut self) {
        if self.raw_mode {
            if let Err(err) = terminal::disable_raw_mode() {
                log::warn!("Failed to restore terminal mode: {err}");
            }
        }
    }
}

/// Consumes every pending terminal event, reporting whether one was a quit key.
fn drain_for_quit() -> std::io::Result<bool> {
    let mut quit = false;
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            quit |= is_quit_key(&key);
        }
    }
    Ok(quit)
}

/// Raw mode swallows the interrupt signal, so `Ctrl+C` counts as quit too.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            assert!(is_quit_key(&KeyEvent::new(code, KeyModifiers::NONE)));
        }
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn test_ctrl_c_quits() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }

    #[test]
    fn test_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(!is_quit_key(&key));
    }
}
