use anyhow::Context;
use clap::Parser;
use log::info;
use panescope::engine::image::Image;
use panescope::engine::parse_address;
use panescope::engine::stepper::ImageEngine;
use panescope::log::LogBuffer;
use panescope::session::SessionFeed;
use panescope::ui::config::FileConfig;
use panescope::ui::tui::proto;
use panescope::ui::tui::TuiApplication;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn parse_hex(s: &str) -> Result<u64, String> {
    parse_address(s).ok_or_else(|| format!("invalid hex address: {s}"))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Executable image to explore
    image: PathBuf,

    /// Initial disassembly address (hex), image entry point by default
    #[arg(long, value_parser = parse_hex)]
    address: Option<u64>,

    /// Number of instructions in a disassembly window
    #[arg(long)]
    window: Option<usize>,

    /// Log polling period in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Path to a configuration file
    #[arg(long, env = "PANESCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a keymap file
    #[arg(long)]
    keymap: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut file_config = FileConfig::load(args.config.as_deref())?;
    if args.window.is_some() {
        file_config.disasm_window = args.window;
    }
    if args.poll_ms.is_some() {
        file_config.log_poll_ms = args.poll_ms;
    }
    panescope::ui::config::set(file_config.into_ui_config(args.keymap));

    let log_buffer = LogBuffer::default();
    panescope::log::install(log_buffer.clone())?;

    let image = Image::load(&args.image)
        .with_context(|| format!("load image {}", args.image.display()))?;
    let feed = SessionFeed::default();
    let engine = Arc::new(
        ImageEngine::new(image, feed.clone(), log_buffer).with_run_delay(Duration::from_millis(300)),
    );
    let session = engine.start();
    info!(target: "session", "explore {} in session {session}", args.image.display());

    let address = args.address.unwrap_or_else(|| engine.pc());
    let (dispatcher, responses) = proto::dispatcher(engine.clone(), engine)?;

    TuiApplication::new(dispatcher, responses, feed.watch())
        .with_address(Some(address))
        .run()
}
