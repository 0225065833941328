pub mod port;

use crate::engine::{format_address, parse_address};
use crate::session::SessionWatcher;
use crate::ui;
use crate::ui::tui::app::port::{ResponsesPort, SessionPort, UserEvent};
use crate::ui::tui::components::asm::{self, Asm};
use crate::ui::tui::components::callstack::{self, CallStack};
use crate::ui::tui::components::control::GlobalControl;
use crate::ui::tui::components::input::{Input, InputStringType};
use crate::ui::tui::components::logs::{self, Logs};
use crate::ui::tui::components::status::{self, Status};
use crate::ui::tui::components::tabs::{LeftTab, LeftTabKind};
use crate::ui::tui::proto::{Dispatcher, Responses};
use anyhow::anyhow;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tuirealm::props::{PropPayload, PropValue};
use tuirealm::terminal::TerminalBridge;
use tuirealm::tui::layout::Alignment;
use tuirealm::tui::layout::{Constraint, Direction, Layout};
use tuirealm::{props, Application, AttrValue, Attribute, EventListenerCfg};

use super::{Id, Msg};

const ATTR_INPUT_DATA_TYPE: &str = "input_data_type";

pub struct Model {
    /// Application
    pub app: Application<Id, Msg, UserEvent>,
    /// Indicates that the application must quit
    pub quit: bool,
    /// Tells whether to redraw interface
    pub redraw: bool,
    /// Used to draw to terminal
    pub terminal: TerminalBridge,

    left_tab: LeftTabKind,
}

impl Model {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        responses: Responses,
        session: SessionWatcher,
        address: Option<u64>,
    ) -> anyhow::Result<Self> {
        let mut model = Self {
            app: Self::init_app(dispatcher, responses, session, address)?,
            quit: false,
            redraw: true,
            terminal: TerminalBridge::new()?,
            left_tab: LeftTabKind::default(),
        };
        model.show_left_tab(LeftTabKind::default())?;
        Ok(model)
    }
}

impl Model {
    pub fn view(&mut self) {
        let left_window = self.left_tab_id();
        _ = self.terminal.raw_mut().draw(|f| {
            let input_in_focus = self.app.focus() == Some(&Id::Input);

            let mut constraints = vec![Constraint::Min(9)];
            if input_in_focus {
                constraints.push(Constraint::Length(3));
            }
            constraints.push(Constraint::Length(3));

            let main_chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(constraints)
                .split(f.size());

            let window_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(main_chunks[0]);

            let left_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(window_chunks[0]);

            self.app.view(&Id::LeftTabs, f, left_chunks[0]);
            self.app.view(&left_window, f, left_chunks[1]);
            self.app.view(&Id::Asm, f, window_chunks[1]);

            if input_in_focus {
                self.app.view(&Id::Input, f, main_chunks[1]);
                self.app.view(&Id::Status, f, main_chunks[2]);
            } else {
                self.app.view(&Id::Status, f, main_chunks[1]);
            }
        });
    }

    fn init_app(
        dispatcher: Arc<Dispatcher>,
        responses: Responses,
        session: SessionWatcher,
        address: Option<u64>,
    ) -> anyhow::Result<Application<Id, Msg, UserEvent>> {
        let config = ui::config::current();

        let mut app: Application<Id, Msg, UserEvent> = Application::init(
            EventListenerCfg::default()
                .default_input_listener(Duration::from_millis(20))
                .port(Box::new(SessionPort::new(session)), Duration::from_millis(10))
                .port(
                    Box::new(ResponsesPort::new(responses)),
                    Duration::from_millis(10),
                )
                .poll_timeout(Duration::from_millis(10))
                .tick_interval(Duration::from_millis(200)),
        );

        app.mount(
            Id::GlobalControl,
            Box::new(GlobalControl::new(dispatcher.clone())),
            GlobalControl::subscriptions(),
        )?;
        app.mount(Id::Input, Box::<Input>::default(), vec![])?;
        app.mount(Id::Status, Box::<Status>::default(), Status::subscriptions())?;
        app.mount(Id::LeftTabs, Box::<LeftTab>::default(), vec![])?;

        app.mount(
            Id::CallStack,
            Box::new(CallStack::new(dispatcher.clone())),
            CallStack::subscriptions(),
        )?;
        app.mount(
            Id::Logs,
            Box::new(Logs::new(dispatcher.clone(), config.log_poll_interval)),
            Logs::subscriptions(),
        )?;
        app.mount(
            Id::Asm,
            Box::new(Asm::new(
                dispatcher,
                config.disasm_window,
                address,
                config.follow,
            )),
            Asm::subscriptions(),
        )?;

        Ok(app)
    }

    fn left_tab_id(&self) -> Id {
        match self.left_tab {
            LeftTabKind::CallStack => Id::CallStack,
            LeftTabKind::Logs => Id::Logs,
        }
    }

    /// Select a left window. Call stack is synchronized only while visible, so disassembly
    /// follows frames only then. Logs are polled regardless of a selected tab.
    fn show_left_tab(&mut self, tab: LeftTabKind) -> anyhow::Result<()> {
        self.left_tab = tab;
        self.app.attr(
            &Id::LeftTabs,
            Attribute::Value,
            AttrValue::Payload(PropPayload::One(PropValue::Usize(tab.index()))),
        )?;
        self.app.attr(
            &Id::CallStack,
            Attribute::Custom(callstack::ATTR_MOUNTED),
            AttrValue::Flag(tab == LeftTabKind::CallStack),
        )?;
        self.app.attr(
            &Id::Asm,
            Attribute::Custom(asm::ATTR_FOLLOW_SOURCE),
            AttrValue::Flag(tab == LeftTabKind::CallStack),
        )?;
        let window = self.left_tab_id();
        self.app.active(&window)?;
        Ok(())
    }

    fn open_input(
        &mut self,
        title: &str,
        data_type: InputStringType,
        input_type: props::InputType,
        value: String,
    ) -> anyhow::Result<()> {
        self.app
            .attr(&Id::Input, Attribute::InputType, AttrValue::InputType(input_type))?;
        self.app.attr(
            &Id::Input,
            Attribute::Title,
            AttrValue::Title((title.to_string(), Alignment::Left)),
        )?;
        self.app
            .attr(&Id::Input, Attribute::Value, AttrValue::String(value))?;
        self.app.attr(
            &Id::Input,
            Attribute::Custom(ATTR_INPUT_DATA_TYPE),
            AttrValue::String(data_type.to_string()),
        )?;

        self.app.active(&Id::Input)?;
        Ok(())
    }

    fn close_input(&mut self) -> anyhow::Result<()> {
        self.app.blur()?;
        Ok(())
    }

    fn disasm_goto(&mut self, attr: &'static str, addr: u64) -> anyhow::Result<()> {
        self.app.attr(
            &Id::Asm,
            Attribute::Custom(attr),
            AttrValue::String(format_address(addr)),
        )?;
        Ok(())
    }
}

impl Model {
    pub fn update(&mut self, msg: Option<Msg>) -> anyhow::Result<Option<Msg>> {
        if let Some(msg) = msg {
            // Set redraw
            self.redraw = true;
            // Match message
            match msg {
                Msg::AppClose => {
                    self.app.attr(
                        &Id::Logs,
                        Attribute::Custom(logs::ATTR_ACTIVE),
                        AttrValue::Flag(false),
                    )?;
                    self.quit = true;
                }
                Msg::SwitchLeftTab => {
                    self.show_left_tab(self.left_tab.next())?;
                }
                Msg::LeftWindowInFocus => {
                    let window = self.left_tab_id();
                    self.app.active(&window)?;
                }
                Msg::AsmInFocus => {
                    self.app.active(&Id::Asm)?;
                }
                Msg::DisasmGoto(addr) => {
                    self.disasm_goto(asm::ATTR_GOTO, addr)?;
                    self.app.active(&Id::Asm)?;
                }
                Msg::InnermostFrame(addr) => {
                    self.disasm_goto(asm::ATTR_FOLLOW, addr)?;
                }
                Msg::AddressInput => {
                    self.open_input(
                        "Go to address",
                        InputStringType::DisasmAddress,
                        props::InputType::Custom(
                            |s| -> bool { parse_address(s).is_some() },
                            |_, _| -> bool { true },
                        ),
                        String::new(),
                    )?;
                }
                Msg::SearchInput => {
                    let query = self
                        .app
                        .query(&Id::Logs, Attribute::Custom(logs::ATTR_QUERY))?
                        .map(|v| v.unwrap_string())
                        .unwrap_or_default();
                    self.open_input(
                        "Search logs",
                        InputStringType::LogSearch,
                        props::InputType::Text,
                        query,
                    )?;
                }
                Msg::Input(input) => {
                    let input_data_type = self
                        .app
                        .query(&Id::Input, Attribute::Custom(ATTR_INPUT_DATA_TYPE))?
                        .map(|v| v.unwrap_string())
                        .ok_or(anyhow!("input data type is not set"))?;
                    let input_data_type = InputStringType::from_str(&input_data_type)?;

                    self.close_input()?;
                    match input_data_type {
                        InputStringType::DisasmAddress => {
                            let addr = parse_address(&input)
                                .ok_or(anyhow!("invalid address: {input}"))?;
                            return Ok(Some(Msg::DisasmGoto(addr)));
                        }
                        InputStringType::LogSearch => {
                            self.app.attr(
                                &Id::Logs,
                                Attribute::Custom(logs::ATTR_QUERY),
                                AttrValue::String(input),
                            )?;
                        }
                    }
                }
                Msg::InputCancel => {
                    self.close_input()?;
                }
                Msg::Notify(notification) => {
                    self.app.attr(
                        &Id::Status,
                        Attribute::Custom(status::ATTR_NOTIFICATION),
                        status::notification_attr(&notification),
                    )?;
                }
                Msg::None => {}
            }
        }

        Ok(None)
    }
}
