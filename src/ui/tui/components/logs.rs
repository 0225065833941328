use crate::channel::logs::{LogChannel, LogLevel, LogsRequest};
use crate::channel::Generation;
use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::components::message_table;
use crate::ui::tui::config::{CommonAction, SpecialAction};
use crate::ui::tui::proto::Dispatcher;
use crate::ui::tui::{Id, Msg};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tui_realm_stdlib::Table;
use tuirealm::command::{Cmd, CmdResult, Direction, Position};
use tuirealm::props::{Alignment, BorderType, Borders, Color, Style, TableBuilder, TextSpan};
use tuirealm::tui::layout::Rect;
use tuirealm::{
    AttrValue, Attribute, Component, Event, Frame, MockComponent, State, Sub, SubClause,
    SubEventClause,
};

/// Search query (string).
pub const ATTR_QUERY: &str = "query";
/// Polling switch.
pub const ATTR_ACTIVE: &str = "active";

fn fg_for_level(level: &str) -> Color {
    match LogLevel::from_str(level) {
        Ok(LogLevel::Error) => Color::Red,
        Ok(LogLevel::Warning) => Color::Yellow,
        Ok(LogLevel::Info) => Color::Green,
        Ok(LogLevel::Debug) => Color::Magenta,
        Err(_) => Color::LightBlue,
    }
}

pub struct Logs {
    component: Table,
    channel: LogChannel,
    dispatcher: Arc<Dispatcher>,
}

impl Logs {
    /// Create a pane and start polling.
    pub fn new(dispatcher: Arc<Dispatcher>, poll_interval: Duration) -> Self {
        let component = Table::default()
            .borders(
                Borders::default()
                    .modifiers(BorderType::Rounded)
                    .color(Color::LightYellow),
            )
            .inactive(Style::default().fg(Color::Gray))
            .scroll(true)
            .highlighted_color(Color::LightYellow)
            .highlighted_str("▶")
            .rewind(false)
            .step(4)
            .widths(&[25, 8, 67])
            .headers(&["Time", "Level", "Message"]);

        let mut this = Self {
            component,
            channel: LogChannel::new(poll_interval),
            dispatcher,
        };
        let req = this.channel.activate(Instant::now());
        this.request(req);
        this
    }

    pub fn subscriptions() -> Vec<Sub<Id, UserEvent>> {
        vec![
            Sub::new(SubEventClause::Tick, SubClause::Always),
            Sub::new(
                // concrete response doesn't meter
                SubEventClause::User(UserEvent::LogsFetched(Generation::default(), Ok(vec![]))),
                SubClause::Always,
            ),
            Sub::new(
                SubEventClause::User(UserEvent::LogsCleared(Ok(()))),
                SubClause::Always,
            ),
        ]
    }

    fn request(&mut self, req: Option<LogsRequest>) {
        if let Some(req) = req {
            self.dispatcher.fetch_logs(req);
        }
        self.render();
    }

    fn render(&mut self) {
        let mut title = format!(
            "Logs [level: {}] {}",
            self.channel.level(),
            self.channel.summary()
        );
        if !self.channel.query().is_empty() {
            title.push_str(&format!(" [search: {}]", self.channel.query()));
        }
        if let Some(ref err) = self.channel.state().error {
            title.push_str(&format!(" (poll failed: {err})"));
        }
        self.component
            .attr(Attribute::Title, AttrValue::Title((title, Alignment::Center)));

        let table = match self.channel.empty_copy() {
            Some(copy) => message_table([TextSpan::new(copy).fg(Color::Gray)]),
            None => {
                let mut builder = TableBuilder::default();
                for entry in self.channel.visible() {
                    builder
                        .add_col(TextSpan::new(&entry.timestamp))
                        .add_col(TextSpan::new(&entry.level).fg(fg_for_level(&entry.level)))
                        .add_col(TextSpan::new(&entry.message))
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
}

impl MockComponent for Logs {
    fn view(&mut self, frame: &mut Frame, area: Rect) {
        self.component.view(frame, area)
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        match attr {
            Attribute::Custom(ATTR_QUERY) => {
                Some(AttrValue::String(self.channel.query().to_string()))
            }
            attr => self.component.query(attr),
        }
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        match (attr, value) {
            (Attribute::Custom(ATTR_QUERY), AttrValue::String(query)) => {
                self.channel.set_query(query.trim());
                self.render();
            }
            (Attribute::Custom(ATTR_ACTIVE), AttrValue::Flag(active)) => {
                if active {
                    let req = self.channel.activate(Instant::now());
                    self.request(req);
                } else {
                    self.channel.deactivate();
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

impl Component<Msg, UserEvent> for Logs {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        match ev {
            Event::Keyboard(key_event) => {
                let keymap = &ui::config::current().tui_keymap;
                if let Some(action) = keymap.get_special(&key_event) {
                    match action {
                        SpecialAction::CycleLogLevel => {
                            self.channel.cycle_level();
                            self.render();
                        }
                        SpecialAction::SearchLogs => return Some(Msg::SearchInput),
                        SpecialAction::ClearLogs => self.dispatcher.clear_logs(),
                        _ => {}
                    }
                } else if let Some(action) = keymap.get_common(&key_event) {
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
                        _ => {}
                    }
                }
            }
            Event::Tick => {
                let req = self.channel.tick(Instant::now());
                if let Some(req) = req {
                    self.dispatcher.fetch_logs(req);
                }
            }
            Event::User(UserEvent::LogsFetched(gen, result)) => {
                let notification = self.channel.settle_poll(gen, result);
                self.render();
                if let Some(notification) = notification {
                    return Some(Msg::Notify(notification));
                }
            }
            Event::User(UserEvent::LogsCleared(result)) => {
                let notification = self.channel.settle_clear(result);
                self.render();
                return Some(Msg::Notify(notification));
            }
            _ => {}
        };
        Some(Msg::None)
    }
}
