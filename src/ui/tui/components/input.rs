use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::config::CommonAction;
use crate::ui::tui::Msg;
use strum_macros::{Display, EnumString};
use tuirealm::command::{Cmd, CmdResult, Direction, Position};
use tuirealm::event::{Key, KeyEvent};
use tuirealm::props::{Borders, InputType};
use tuirealm::tui::layout::Alignment;
use tuirealm::tui::style::{Color, Style};
use tuirealm::tui::widgets::BorderType;
use tuirealm::{Component, Event, MockComponent, State, StateValue};

/// What an input line is currently used for.
#[derive(Debug, PartialEq, Display, EnumString)]
pub enum InputStringType {
    DisasmAddress,
    LogSearch,
}

#[derive(MockComponent)]
pub struct Input {
    component: tui_realm_stdlib::Input,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            component: tui_realm_stdlib::Input::default()
                .borders(
                    Borders::default()
                        .modifiers(BorderType::Rounded)
                        .color(Color::LightYellow),
                )
                .foreground(Color::LightYellow)
                .input_type(InputType::Text)
                .title("", Alignment::Left)
                .value("")
                .invalid_style(Style::default().fg(Color::Red)),
        }
    }
}

impl Component<Msg, UserEvent> for Input {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        let Event::Keyboard(key_event) = ev else {
            return Some(Msg::None);
        };

        let keymap = &ui::config::current().tui_keymap;
        let _ = match keymap.get_common(&key_event) {
            Some(CommonAction::Left) => self.perform(Cmd::Move(Direction::Left)),
            Some(CommonAction::Right) => self.perform(Cmd::Move(Direction::Right)),
            Some(CommonAction::GotoBegin) => self.perform(Cmd::GoTo(Position::Begin)),
            Some(CommonAction::GotoEnd) => self.perform(Cmd::GoTo(Position::End)),
            Some(CommonAction::Delete) => self.perform(Cmd::Cancel),
            Some(CommonAction::Backspace) => self.perform(Cmd::Delete),
            Some(CommonAction::Submit) => {
                let state = self.perform(Cmd::Submit);
                if let CmdResult::Submit(State::One(StateValue::String(input))) = state {
                    return Some(Msg::Input(input));
                }
                CmdResult::None
            }
            Some(CommonAction::Cancel) => return Some(Msg::InputCancel),
            _ => match key_event {
                KeyEvent {
                    code: Key::Char(ch),
                    ..
                } => self.perform(Cmd::Type(ch)),
                _ => CmdResult::None,
            },
        };
        Some(Msg::None)
    }
}
