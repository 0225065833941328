use crate::channel::Notification;
use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::config::SpecialAction;
use crate::ui::tui::proto::{ControlCommand, Dispatcher};
use crate::ui::tui::{Id, Msg};
use std::sync::Arc;
use tuirealm::{
    AttrValue, Attribute, Component, Event, MockComponent, Sub, SubClause, SubEventClause,
};

/// Actions available regardless of a focused pane.
const GLOBAL_ACTIONS: [SpecialAction; 8] = [
    SpecialAction::SwitchWindowTab,
    SpecialAction::FocusLeftWindow,
    SpecialAction::FocusRightWindow,
    SpecialAction::CloseApp,
    SpecialAction::Step,
    SpecialAction::Continue,
    SpecialAction::Stop,
    SpecialAction::Restart,
];

/// Hotkeys are not intercepted while user types into an input line.
fn input_closed() -> SubClause<Id> {
    SubClause::Not(Box::new(SubClause::HasAttrValue(
        Id::Input,
        Attribute::Focus,
        AttrValue::Flag(true),
    )))
}

#[derive(MockComponent)]
pub struct GlobalControl {
    component: tui_realm_stdlib::Phantom,
    dispatcher: Arc<Dispatcher>,
}

impl GlobalControl {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            component: tui_realm_stdlib::Phantom::default(),
            dispatcher,
        }
    }

    pub fn subscriptions() -> Vec<Sub<Id, UserEvent>> {
        let keymap = &ui::config::current().tui_keymap;
        let mut subs: Vec<_> = GLOBAL_ACTIONS
            .into_iter()
            .flat_map(|action| keymap.keys_for_special_action(action))
            .map(|key| Sub::new(SubEventClause::Keyboard(*key), input_closed()))
            .collect();
        subs.push(Sub::new(
            // concrete error doesn't meter
            SubEventClause::User(UserEvent::ControlFailed(
                ControlCommand::Step,
                String::default(),
            )),
            SubClause::Always,
        ));
        subs
    }
}

impl Component<Msg, UserEvent> for GlobalControl {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        let msg = match ev {
            Event::Keyboard(key_event) => {
                let keymap = &ui::config::current().tui_keymap;
                let Some(action) = keymap.get_special(&key_event) else {
                    return Some(Msg::None);
                };

                let cmd = match action {
                    SpecialAction::SwitchWindowTab => return Some(Msg::SwitchLeftTab),
                    SpecialAction::FocusLeftWindow => return Some(Msg::LeftWindowInFocus),
                    SpecialAction::FocusRightWindow => return Some(Msg::AsmInFocus),
                    SpecialAction::CloseApp => return Some(Msg::AppClose),
                    SpecialAction::Step => ControlCommand::Step,
                    SpecialAction::Continue => ControlCommand::Resume,
                    SpecialAction::Stop => ControlCommand::Stop,
                    SpecialAction::Restart => ControlCommand::Restart,
                    _ => return Some(Msg::None),
                };
                self.dispatcher.control(cmd);
                Msg::None
            }
            Event::User(UserEvent::ControlFailed(cmd, err)) => {
                Msg::Notify(Notification::error(format!("Failed to {cmd}: {err}")))
            }
            _ => Msg::None,
        };
        Some(msg)
    }
}
