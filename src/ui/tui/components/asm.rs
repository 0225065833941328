use crate::channel::disasm::{DisasmChannel, DisasmRequest};
use crate::channel::{Generation, ViewState};
use crate::engine::{format_address, parse_address};
use crate::ui;
use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::components::message_table;
use crate::ui::tui::config::{CommonAction, SpecialAction};
use crate::ui::tui::proto::Dispatcher;
use crate::ui::tui::{Id, Msg};
use std::sync::Arc;
use tui_realm_stdlib::Table;
use tuirealm::command::{Cmd, CmdResult, Direction, Position};
use tuirealm::props::{Alignment, BorderType, Borders, Color, Style, TableBuilder, TextSpan};
use tuirealm::tui::layout::Rect;
use tuirealm::{
    AttrValue, Attribute, Component, Event, Frame, MockComponent, State, Sub, SubClause,
    SubEventClause,
};

/// Move disassembly window to an address (hex string).
pub const ATTR_GOTO: &str = "goto";
/// Address of the innermost frame, applied only in follow mode (hex string).
pub const ATTR_FOLLOW: &str = "follow";
/// Whether the call stack pane, the source of innermost frames, is shown (flag).
pub const ATTR_FOLLOW_SOURCE: &str = "follow_source";

/// Pane title: current address and follow mode state.
fn title(address: Option<u64>, follow: bool, follow_source: bool) -> String {
    let mut title = match address {
        Some(addr) => format!("Disassembly at {}", format_address(addr)),
        None => "Disassembly".to_string(),
    };
    match (follow, follow_source) {
        (true, true) => title.push_str(" [follow]"),
        (true, false) => title.push_str(" [follow: open call stack]"),
        (false, _) => {}
    }
    title
}

pub struct Asm {
    component: Table,
    channel: DisasmChannel,
    dispatcher: Arc<Dispatcher>,
    follow: bool,
    follow_source: bool,
}

impl Asm {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        window: usize,
        address: Option<u64>,
        follow: bool,
    ) -> Self {
        let component = Table::default()
            .borders(
                Borders::default()
                    .modifiers(BorderType::Rounded)
                    .color(Color::LightYellow),
            )
            .inactive(Style::default().fg(Color::Gray))
            .title("Disassembly", Alignment::Center)
            .scroll(true)
            .highlighted_color(Color::LightYellow)
            .highlighted_str("▶")
            .rewind(false)
            .step(8)
            .widths(&[14, 24, 26, 10, 26])
            .headers(&["Address", "Symbol", "Bytes", "Mnemonic", "Operands"]);

        let mut channel = DisasmChannel::new(window);
        // there is no session yet, address is applied when a first snapshot arrives
        _ = channel.retarget(None, address);

        let mut this = Self {
            component,
            channel,
            dispatcher,
            follow,
            follow_source: true,
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
                SubEventClause::User(UserEvent::DisasmFetched(Generation::default(), Ok(vec![]))),
                SubClause::Always,
            ),
        ]
    }

    fn request(&mut self, req: Option<DisasmRequest>) {
        if let Some(req) = req {
            self.dispatcher.fetch_disasm(req);
        }
        self.render();
    }

    fn render(&mut self) {
        let title = title(self.channel.address(), self.follow, self.follow_source);
        self.component
            .attr(Attribute::Title, AttrValue::Title((title, Alignment::Center)));

        let table = match self.channel.view() {
            ViewState::Loading => message_table([TextSpan::new("Loading disassembly...")]),
            ViewState::Error(err) => message_table([
                TextSpan::new("Error loading disassembly:").fg(Color::Red),
                TextSpan::new(err).fg(Color::Red),
            ]),
            ViewState::Empty => message_table([TextSpan::new("No disassembly available")]),
            ViewState::Populated(instructions) => {
                let mut builder = TableBuilder::default();
                for instr in instructions {
                    builder
                        .add_col(TextSpan::new(&instr.address).fg(Color::Blue))
                        .add_col(TextSpan::new(&instr.symbol).fg(Color::Gray))
                        .add_col(TextSpan::new(&instr.bytes).fg(Color::DarkGray))
                        .add_col(TextSpan::new(&instr.mnemonic).fg(Color::Red))
                        .add_col(TextSpan::new(&instr.op_str).fg(Color::Green))
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

impl MockComponent for Asm {
    fn view(&mut self, frame: &mut Frame, area: Rect) {
        self.component.view(frame, area)
    }

    fn query(&self, attr: Attribute) -> Option<AttrValue> {
        self.component.query(attr)
    }

    fn attr(&mut self, attr: Attribute, value: AttrValue) {
        match (attr, value) {
            (Attribute::Custom(ATTR_GOTO), AttrValue::String(addr)) => {
                if let Some(addr) = parse_address(&addr) {
                    let req = self.channel.goto(addr);
                    self.request(req);
                }
            }
            (Attribute::Custom(ATTR_FOLLOW), AttrValue::String(addr)) => {
                if let Some(addr) = parse_address(&addr).filter(|_| self.follow) {
                    let req = self.channel.goto(addr);
                    self.request(req);
                }
            }
            (Attribute::Custom(ATTR_FOLLOW_SOURCE), AttrValue::Flag(available)) => {
                self.follow_source = available;
                self.render();
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

impl Component<Msg, UserEvent> for Asm {
    fn on(&mut self, ev: Event<UserEvent>) -> Option<Msg> {
        match ev {
            Event::Keyboard(key_event) => {
                let keymap = &ui::config::current().tui_keymap;
                if let Some(action) = keymap.get_special(&key_event) {
                    match action {
                        SpecialAction::GotoAddress => return Some(Msg::AddressInput),
                        SpecialAction::Reload => {
                            let req = self.channel.reload();
                            self.request(req);
                        }
                        SpecialAction::ToggleFollow => {
                            self.follow = !self.follow;
                            self.render();
                        }
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
            Event::User(UserEvent::Session(snapshot)) => {
                let req = self.channel.set_session(snapshot.map(|s| s.id));
                self.request(req);
            }
            Event::User(UserEvent::DisasmFetched(gen, result)) => {
                let notification = self.channel.settle(gen, result);
                self.render();
                if let Some(notification) = notification {
                    return Some(Msg::Notify(notification));
                }
            }
            _ => {}
        };
        Some(Msg::None)
    }
}

#[cfg(test)]
mod test {
    use crate::ui::tui::components::asm::title;

    #[test]
    fn test_title() {
        struct TestCase {
            address: Option<u64>,
            follow: bool,
            follow_source: bool,
            expected: &'static str,
        }
        let cases = [
            TestCase {
                address: None,
                follow: false,
                follow_source: true,
                expected: "Disassembly",
            },
            TestCase {
                address: Some(0x401000),
                follow: true,
                follow_source: true,
                expected: "Disassembly at 0x401000 [follow]",
            },
            TestCase {
                address: Some(0x401000),
                follow: true,
                follow_source: false,
                expected: "Disassembly at 0x401000 [follow: open call stack]",
            },
            TestCase {
                address: Some(0x1000),
                follow: false,
                follow_source: false,
                expected: "Disassembly at 0x1000",
            },
        ];

        for tc in cases {
            assert_eq!(title(tc.address, tc.follow, tc.follow_source), tc.expected);
        }
    }
}
