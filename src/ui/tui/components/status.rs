use crate::channel::{Notification, NotificationKind};
use crate::session::{Session, SessionStatus};
use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::config::{KeyMap, SpecialAction};
use crate::ui::tui::{Id, Msg};
use tui_realm_stdlib::{Container, Paragraph};
use tuirealm::command::{Cmd, CmdResult};
use tuirealm::props::{Borders, Layout, PropPayload, PropValue, TextSpan};
use tuirealm::tui::layout::{Alignment, Constraint, Rect};
use tuirealm::tui::style::Color;
use tuirealm::tui::widgets::BorderType;
use tuirealm::{
    AttrValue, Attribute, Component, Event, Frame, MockComponent, State, Sub, SubClause,
    SubEventClause,
};

/// Notification text, success or error is selected by a color.
pub const ATTR_NOTIFICATION: &str = "notification";

const HELP_IDX: usize = 0;
const SESSION_IDX: usize = 1;
const NOTIFICATION_IDX: usize = 2;

fn paragraph(title: &str, text: TextSpan) -> Paragraph {
    Paragraph::default()
        .text(&[text])
        .alignment(Alignment::Left)
        .title(title, Alignment::Center)
        .borders(
            Borders::default()
                .color(Color::White)
                .modifiers(BorderType::Rounded),
        )
}

fn text_payload(span: TextSpan) -> AttrValue {
    AttrValue::Payload(PropPayload::Vec(vec![PropValue::TextSpan(span)]))
}

/// Render a session snapshot as a status line.
pub fn session_line(snapshot: Option<&Session>) -> TextSpan {
    let Some(session) = snapshot else {
        return TextSpan::new("no session").fg(Color::Red);
    };
    let color = match session.status {
        SessionStatus::Paused => Color::Green,
        SessionStatus::Running => Color::Yellow,
        _ => Color::Red,
    };
    TextSpan::new(format!("{} (event {})", session.status, session.current_event)).fg(color)
}

pub fn notification_line(notification: &Notification) -> TextSpan {
    let color = match notification.kind {
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
    };
    TextSpan::new(&notification.text).fg(color)
}

/// Hotkey summary. Follow moves disassembly with frames fetched by the call stack tab.
pub fn help_line(keymap: &KeyMap) -> String {
    [
        (SpecialAction::Step, "step"),
        (SpecialAction::Continue, "continue"),
        (SpecialAction::Stop, "stop"),
        (SpecialAction::Restart, "restart"),
        (SpecialAction::SwitchWindowTab, "switch tab"),
        (SpecialAction::ToggleFollow, "follow (call stack tab)"),
        (SpecialAction::CloseApp, "quit"),
    ]
    .into_iter()
    .map(|(action, name)| format!("<{}> {name}", keymap.hint(action)))
    .collect::<Vec<_>>()
    .join(" | ")
}

pub struct Status {
    component: Container,
}

impl Default for Status {
    fn default() -> Self {
        let help = help_line(&ui::config::current().tui_keymap);
        let help = paragraph("Help", TextSpan::new(help).fg(Color::Green).bold());
        let session = paragraph("Session", session_line(None));
        let notification = paragraph("Last event", TextSpan::new(""));

        Self {
            component: Container::default()
                .layout(
                    Layout::default()
                        .direction(tuirealm::tui::layout::Direction::Horizontal)
                        .constraints(
                            [
                                Constraint::Percentage(50),
                                Constraint::Percentage(15),
                                Constraint::Percentage(35),
                            ]
                            .as_ref(),
                        ),
                )
                .children(vec![Box::new(help), Box::new(session), Box::new(notification)]),
        }
    }
}

impl Status {
    pub fn subscriptions() -> Vec<Sub<Id, UserEvent>> {
        vec![Sub::new(
            SubEventClause::User(UserEvent::Session(None)),
            SubClause::Always,
        )]
    }
}

impl MockComponent for Status {
    fn view(&mut self, frame: &mut Frame, area: Rect) {
        self.component.view(frame, area)
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        self.component.query(attr)
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        match attr {
            Attribute::Custom(ATTR_NOTIFICATION) => {
                self.component.children[NOTIFICATION_IDX].attr(Attribute::Text, value)
            }
            Attribute::Text => self.component.children[SESSION_IDX].attr(attr, value),
            attr => self.component.children[HELP_IDX].attr(attr, value),
        }
    }

    fn state(&self) -> State {
        self.component.state()
    }

    fn perform(&mut self, cmd: Cmd) -> CmdResult {
        self.component.perform(cmd)
    }
}

impl Component<Msg, UserEvent> for Status {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        match ev {
            Event::User(UserEvent::Session(snapshot)) => {
                self.attr(Attribute::Text, text_payload(session_line(snapshot.as_ref())));
                Some(Msg::None)
            }
            _ => None,
        }
    }
}

/// Attribute value for [`ATTR_NOTIFICATION`].
pub fn notification_attr(notification: &Notification) -> AttrValue {
    text_payload(notification_line(notification))
}
