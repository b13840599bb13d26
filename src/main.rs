use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod inputter;
mod model;
mod record;
mod source;
mod ui;
mod view_state;

use controller::Controller;
use domain::{TVConfig, TVError};
use model::{Model, Status};
use source::Dataset;
use ui::TableUI;
use view_state::PageSize;

#[derive(Parser, Debug)]
#[command(
    name = "carrierview",
    version,
    about = "Browse motor carrier registration records in the terminal.",
    long_about = "Browse motor carrier registration records in the terminal.\n\nWithout a PATH the bundled records are shown. PATH may be a json file\n({\"data_items\": [...]}) or a csv, parquet or arrow file with the same column names."
)]
struct Args {
    /// Data file to show instead of the bundled records.
    #[arg(value_name = "PATH")]
    path: Option<String>,

    /// Rows per page (5, 10 or 15).
    #[arg(short = 'p', long, default_value = "10", value_parser = parse_page_size)]
    page_size: PageSize,

    /// Widest a table column may get.
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events.
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Where log output goes.
    #[arg(long, default_value = "carrierview.log")]
    log_file: String,

    /// Log level, unless RUST_LOG is set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_page_size(s: &str) -> Result<PageSize, String> {
    let rows: usize = s.parse().map_err(|e| format!("{e}"))?;
    PageSize::try_from(rows).map_err(|e| e.to_string())
}

impl Args {
    fn config(&self) -> TVConfig {
        TVConfig::default()
            .page_size(self.page_size)
            .max_column_width(self.max_column_width)
            .event_poll_time(self.event_poll_time)
    }
}

fn init_logging(args: &Args) -> Result<(), TVError> {
    let path = shellexpand::full(&args.log_file)
        .map_err(|e| TVError::LoadingFailed(e.to_string()))?;
    let file = File::create(path.as_ref())?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), TVError> {
    init_logging(args)?;
    let cfg = args.config();
    info!("Starting carrierview with {:?}", cfg);

    let dataset = source::load(args.path.as_deref());

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &cfg, dataset);
    ratatui::restore();
    info!("Bye!");
    result
}

fn event_loop(terminal: &mut DefaultTerminal, cfg: &TVConfig, dataset: Dataset) -> Result<(), TVError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, dataset, size.width as usize, size.height as usize);
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message);
        };
    }
    Ok(())
}
