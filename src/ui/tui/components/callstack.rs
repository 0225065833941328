use crate::channel::callstack::{CallStackChannel, CallStackRequest, CallStackView};
use crate::channel::Generation;
use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::components::message_table;
use crate::ui::tui::config::CommonAction;
use crate::ui::tui::proto::Dispatcher;
use crate::ui::tui::{Id, Msg};
use std::sync::Arc;
use tui_realm_stdlib::Table;
use tuirealm::command::{Cmd, CmdResult, Direction, Position};
use tuirealm::props::{Alignment, BorderType, Borders, Color, Style, TableBuilder, TextSpan};
use tuirealm::tui::layout::Rect;
use tuirealm::{
    AttrValue, Attribute, Component, Event, Frame, MockComponent, State, StateValue, Sub,
    SubClause, SubEventClause,
};

/// Pane visibility flag.
pub const ATTR_MOUNTED: &str = "mounted";

pub struct CallStack {
    component: Table,
    channel: CallStackChannel,
    dispatcher: Arc<Dispatcher>,
}

impl CallStack {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let component = Table::default()
            .borders(
                Borders::default()
                    .modifiers(BorderType::Rounded)
                    .color(Color::LightYellow),
            )
            .inactive(Style::default().fg(Color::Gray))
            .title("Call stack", Alignment::Center)
            .scroll(true)
            .highlighted_color(Color::LightYellow)
            .highlighted_str("▶")
            .rewind(true)
            .step(4)
            .widths(&[4, 16, 30, 50])
            .headers(&["#", "IP", "SP / FP", "Function"]);

        let mut this = Self {
            component,
            channel: CallStackChannel::default(),
            dispatcher,
        };
        this.render();
        this
    }

    pub fn subscriptions() -> Vec<Sub<Id, UserEvent>> {
        vec![
            Sub::new(
                SubEventClause::User(UserEvent::Session(None)),
                SubClause::Always,
            ),
            Sub::new(
                // concrete response doesn't meter
                SubEventClause::User(UserEvent::CallStackFetched(
                    Generation::default(),
                    Ok(vec![]),
                )),
                SubClause::Always,
            ),
        ]
    }

    fn request(&mut self, req: Option<CallStackRequest>) {
        if let Some(req) = req {
            self.dispatcher.fetch_callstack(req);
        }
        self.render();
    }

    fn render(&mut self) {
        let table = match self.channel.view() {
            CallStackView::NoSession => message_table([TextSpan::new("No session available")]),
            CallStackView::NotPaused => message_table([TextSpan::new(
                "Session must be paused to fetch call stack",
            )
            .fg(Color::Yellow)]),
            CallStackView::Failed {
                error,
                retry_on_step,
            } => {
                let mut lines = vec![TextSpan::new(error).fg(Color::Red)];
                if retry_on_step {
                    lines.push(TextSpan::new(
                        "Call stack will retry automatically on next step",
                    ));
                }
                message_table(lines)
            }
            CallStackView::Loading => message_table([TextSpan::new("Loading call stack...")]),
            CallStackView::Empty => message_table([
                TextSpan::new("No call stack data available"),
                TextSpan::new("Call stack will be fetched automatically").fg(Color::Gray),
            ]),
            CallStackView::Ready(frames) => {
                let mut builder = TableBuilder::default();
                for frame in frames {
                    builder
                        .add_col(TextSpan::new(frame.frame_number.to_string()).fg(Color::Cyan))
                        .add_col(TextSpan::new(&frame.instruction_pointer).fg(Color::Blue))
                        .add_col(TextSpan::new(format!(
                            "{} / {}",
                            frame.stack_pointer, frame.frame_pointer
                        )))
                        .add_col(
                            TextSpan::new(frame.symbol_info.as_deref().unwrap_or("???"))
                                .fg(Color::Green),
                        )
                        .add_row();
                }
                let mut table = builder.build();
                table.pop();
                table
            }
        };

        self.component
            .attr(Attribute::Content, AttrValue::Table(table));
    }

    /// Instruction pointer of a selected frame.
    fn selected_ip(&self) -> Option<u64> {
        let CallStackView::Ready(frames) = self.channel.view() else {
            return None;
        };
        let State::One(StateValue::Usize(idx)) = self.component.state() else {
            return None;
        };
        frames.get(idx)?.ip()
    }
}

impl MockComponent for CallStack {
    fn view(&mut self, frame: &mut Frame, area: Rect) {
        self.component.view(frame, area)
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        self.component.query(attr)
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        match (attr, value) {
            (Attribute::Custom(ATTR_MOUNTED), AttrValue::Flag(mounted)) => {
                if mounted {
                    let req = self.channel.mount();
                    self.request(req);
                } else {
                    self.channel.unmount();
                    self.render();
                }
            }
            (attr, value) => self.component.attr(attr, value),
        }
    }

    fn state(&self) -> State {
        self.component.state()
    }

    fn perform(&mut self, cmd: Cmd) -> CmdResult {
        self.component.perform(cmd)
    }
}

impl Component<Msg, UserEvent> for CallStack {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        match ev {
            Event::Keyboard(key_event) => {
                let keymap = &ui::config::current().tui_keymap;
                if let Some(action) = keymap.get_common(&key_event) {
                    match action {
                        CommonAction::Up => {
                            self.perform(Cmd::Move(Direction::Up));
                        }
                        CommonAction::Down => {
                            self.perform(Cmd::Move(Direction::Down));
                        }
                        CommonAction::ScrollUp => {
                            self.perform(Cmd::Scroll(Direction::Up));
                        }
                        CommonAction::ScrollDown => {
                            self.perform(Cmd::Scroll(Direction::Down));
                        }
                        CommonAction::GotoBegin => {
                            self.perform(Cmd::GoTo(Position::Begin));
                        }
                        CommonAction::GotoEnd => {
                            self.perform(Cmd::GoTo(Position::End));
                        }
                        CommonAction::Submit => {
                            if let Some(ip) = self.selected_ip() {
                                return Some(Msg::DisasmGoto(ip));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::User(UserEvent::Session(snapshot)) => {
                let req = self.channel.observe(snapshot.as_ref());
                self.request(req);
            }
            Event::User(UserEvent::CallStackFetched(gen, result)) => {
                if !self.channel.is_current(gen) {
                    return Some(Msg::None);
                }
                let notification = self.channel.settle(gen, result);
                self.render();
                if let Some(notification) = notification {
                    return Some(Msg::Notify(notification));
                }
                if let Some(ip) = self.channel.innermost_ip() {
                    return Some(Msg::InnermostFrame(ip));
                }
            }
            _ => {}
        };
        Some(Msg::None)
    }
}
