use crate::ui::tui::config::{CommonAction, KeyMap, SpecialAction};
use anyhow::bail;
use serde::{de, Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use tuirealm::event::{Key, KeyEvent, KeyModifiers};

fn parse_key_code(raw: &str, is_upper: bool) -> anyhow::Result<Key> {
    let code = match raw {
        "esc" => Key::Esc,
        "enter" => Key::Enter,
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "tab" => Key::Tab,
        "backtab" => Key::BackTab,
        "backspace" => Key::Backspace,
        "del" | "delete" => Key::Delete,
        "space" => Key::Char(' '),
        c if c.chars().count() == 1 => {
            let c = c.chars().next().unwrap_or_default();
            Key::Char(if is_upper { c.to_ascii_uppercase() } else { c })
        }
        f => match f.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            Some(n @ 1..=12) => Key::Function(n),
            _ => bail!("Unknown key code: {raw}"),
        },
    };
    Ok(code)
}

fn parse(raw: &str) -> anyhow::Result<KeyEvent> {
    let mut modifiers = KeyModifiers::empty();
    let raw = raw.to_ascii_lowercase();
    let mut raw: &str = raw.as_ref();
    loop {
        if let Some(end) = raw.strip_prefix("ctrl-") {
            raw = end;
            modifiers.insert(KeyModifiers::CONTROL);
        } else if let Some(end) = raw.strip_prefix("alt-") {
            raw = end;
            modifiers.insert(KeyModifiers::ALT);
        } else if let Some(end) = raw.strip_prefix("shift-") {
            raw = end;
            modifiers.insert(KeyModifiers::SHIFT);
        } else {
            break;
        }
    }

    let code = parse_key_code(raw, modifiers.contains(KeyModifiers::SHIFT))?;
    if code == Key::BackTab {
        // Crossterm always sends SHIFT with backtab
        modifiers.insert(KeyModifiers::SHIFT);
    }
    Ok(KeyEvent { code, modifiers })
}

/// Key event in a keymap file notation, displayed in help hints.
#[derive(PartialEq, Debug)]
pub struct WrappedKeyEvent(pub KeyEvent);

impl fmt::Display for WrappedKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let KeyEvent { code, modifiers } = self.0;
        if modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl-")?;
        }
        if modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt-")?;
        }
        match code {
            Key::Char(' ') => f.write_str("Space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Function(n) => write!(f, "F{n}"),
            Key::BackTab => f.write_str("Shift-Tab"),
            code => write!(f, "{code:?}"),
        }
    }
}

impl<'de> Deserialize<'de> for WrappedKeyEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(WrappedKeyEvent(parse(&s).map_err(de::Error::custom)?))
    }
}

#[derive(Debug, Deserialize)]
struct Common {
    up: Vec<WrappedKeyEvent>,
    down: Vec<WrappedKeyEvent>,
    scroll_down: Vec<WrappedKeyEvent>,
    scroll_up: Vec<WrappedKeyEvent>,
    goto_begin: Vec<WrappedKeyEvent>,
    goto_end: Vec<WrappedKeyEvent>,
    submit: Vec<WrappedKeyEvent>,
    cancel: Vec<WrappedKeyEvent>,
    left: Vec<WrappedKeyEvent>,
    right: Vec<WrappedKeyEvent>,
    input_delete: Vec<WrappedKeyEvent>,
    input_backspace: Vec<WrappedKeyEvent>,
}

#[derive(Debug, Deserialize)]
struct Special {
    switch_window_tab: Vec<WrappedKeyEvent>,
    focus_left: Vec<WrappedKeyEvent>,
    focus_right: Vec<WrappedKeyEvent>,
    close_app: Vec<WrappedKeyEvent>,
    step: Vec<WrappedKeyEvent>,
    r#continue: Vec<WrappedKeyEvent>,
    stop: Vec<WrappedKeyEvent>,
    restart: Vec<WrappedKeyEvent>,
    goto_address: Vec<WrappedKeyEvent>,
    reload: Vec<WrappedKeyEvent>,
    toggle_follow: Vec<WrappedKeyEvent>,
    cycle_log_level: Vec<WrappedKeyEvent>,
    search_logs: Vec<WrappedKeyEvent>,
    clear_logs: Vec<WrappedKeyEvent>,
}

#[derive(Debug, Deserialize)]
pub(super) struct KeyMapConfig {
    special: Special,
    common: Common,
}

impl From<KeyMapConfig> for KeyMap {
    fn from(bindings: KeyMapConfig) -> Self {
        fn append_key<A: Copy>(
            map: &mut HashMap<KeyEvent, A>,
            keys: Vec<WrappedKeyEvent>,
            action: A,
        ) {
            for key in keys {
                map.insert(key.0, action);
            }
        }

        let mut keymap = KeyMap {
            common_keys: Default::default(),
            spec_keys: Default::default(),
        };

        let common_k = &mut keymap.common_keys;
        let cb = bindings.common;
        append_key(common_k, cb.up, CommonAction::Up);
        append_key(common_k, cb.down, CommonAction::Down);
        append_key(common_k, cb.scroll_up, CommonAction::ScrollUp);
        append_key(common_k, cb.scroll_down, CommonAction::ScrollDown);
        append_key(common_k, cb.goto_begin, CommonAction::GotoBegin);
        append_key(common_k, cb.goto_end, CommonAction::GotoEnd);
        append_key(common_k, cb.submit, CommonAction::Submit);
        append_key(common_k, cb.left, CommonAction::Left);
        append_key(common_k, cb.right, CommonAction::Right);
        append_key(common_k, cb.input_delete, CommonAction::Delete);
        append_key(common_k, cb.input_backspace, CommonAction::Backspace);
        append_key(common_k, cb.cancel, CommonAction::Cancel);

        let spec_k = &mut keymap.spec_keys;
        let sb = bindings.special;
        append_key(spec_k, sb.switch_window_tab, SpecialAction::SwitchWindowTab);
        append_key(spec_k, sb.focus_left, SpecialAction::FocusLeftWindow);
        append_key(spec_k, sb.focus_right, SpecialAction::FocusRightWindow);
        append_key(spec_k, sb.close_app, SpecialAction::CloseApp);
        append_key(spec_k, sb.step, SpecialAction::Step);
        append_key(spec_k, sb.r#continue, SpecialAction::Continue);
        append_key(spec_k, sb.stop, SpecialAction::Stop);
        append_key(spec_k, sb.restart, SpecialAction::Restart);
        append_key(spec_k, sb.goto_address, SpecialAction::GotoAddress);
        append_key(spec_k, sb.reload, SpecialAction::Reload);
        append_key(spec_k, sb.toggle_follow, SpecialAction::ToggleFollow);
        append_key(spec_k, sb.cycle_log_level, SpecialAction::CycleLogLevel);
        append_key(spec_k, sb.search_logs, SpecialAction::SearchLogs);
        append_key(spec_k, sb.clear_logs, SpecialAction::ClearLogs);

        keymap
    }
}

#[cfg(test)]
mod test {
    use crate::ui::tui::config::ser::parse;
    use crate::ui::tui::config::WrappedKeyEvent;
    use serde::Deserialize;
    use tuirealm::event::{Key, KeyEvent, KeyModifiers};

    #[test]
    fn test_parse() {
        struct TestCase {
            raw: &'static str,
            expected: Option<KeyEvent>,
        }
        let cases = [
            TestCase {
                raw: "ctrl-r",
                expected: Some(KeyEvent::new(Key::Char('r'), KeyModifiers::CONTROL)),
            },
            TestCase {
                raw: "shift-g",
                expected: Some(KeyEvent::new(Key::Char('G'), KeyModifiers::SHIFT)),
            },
            TestCase {
                raw: "F10",
                expected: Some(KeyEvent::new(Key::Function(10), KeyModifiers::NONE)),
            },
            TestCase {
                raw: "/",
                expected: Some(KeyEvent::new(Key::Char('/'), KeyModifiers::NONE)),
            },
            TestCase {
                raw: "backtab",
                expected: Some(KeyEvent::new(Key::BackTab, KeyModifiers::SHIFT)),
            },
            TestCase {
                raw: "ctrl-unknown",
                expected: None,
            },
        ];

        for tc in cases {
            assert_eq!(parse(tc.raw).ok(), tc.expected, "{}", tc.raw);
        }
    }

    #[test]
    fn test_display() {
        struct TestCase {
            raw: &'static str,
            expected: &'static str,
        }
        let cases = [
            TestCase {
                raw: "ctrl-l",
                expected: "Ctrl-l",
            },
            TestCase {
                raw: "shift-g",
                expected: "G",
            },
            TestCase {
                raw: "f7",
                expected: "F7",
            },
            TestCase {
                raw: "alt-space",
                expected: "Alt-Space",
            },
            TestCase {
                raw: "esc",
                expected: "Esc",
            },
        ];

        for tc in cases {
            let key = WrappedKeyEvent(parse(tc.raw).unwrap());
            assert_eq!(key.to_string(), tc.expected, "{}", tc.raw);
        }
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Bindings {
            keys: Vec<WrappedKeyEvent>,
        }

        let bindings: Bindings = toml::de::from_str(r#"keys = ["ctrl-esc", "/", "F5"]"#).unwrap();
        assert_eq!(
            bindings.keys,
            [
                WrappedKeyEvent(KeyEvent::new(Key::Esc, KeyModifiers::CONTROL)),
                WrappedKeyEvent(KeyEvent::new(Key::Char('/'), KeyModifiers::NONE)),
                WrappedKeyEvent(KeyEvent::new(Key::Function(5), KeyModifiers::NONE)),
            ]
        );
        assert!(toml::de::from_str::<Bindings>(r#"keys = ["f13"]"#).is_err());
    }
}
