mod middle;
mod tui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use middle::Middle;
use trackerbox::PlaybackEngine;
use trackerbox::audio::CpalHost;
use trackerbox::loader::SourceFetcher;
use trackerbox::loader::sample_loader::{add_to_library, index_wav_in_dir};
use trackerbox::pipeline::persistence::{audio_section, load_document_or_default};

#[derive(Parser)]
#[command(name = "trackerbox")]
#[command(version, about = "Terminal step sequencer for sample packs")]
struct Args {
    /// Config document (JSON). Missing or unreadable files start from defaults.
    #[arg(default_value = "trackerbox.json")]
    config: PathBuf,

    /// Directory relative sample files resolve against (default: the config's directory)
    #[arg(long, short = 's')]
    samples: Option<PathBuf>,

    /// Add every .wav in the samples directory to the library
    #[arg(long)]
    scan: bool,

    /// Log file; the terminal belongs to the UI
    #[arg(long, default_value = "trackerbox.log")]
    log_file: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let log = File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trackerbox=info")),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let sample_dir = args.samples.clone().unwrap_or_else(|| {
        args.config
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default()
    });

    let mut doc = load_document_or_default(&args.config);
    if args.scan {
        let paths = index_wav_in_dir(&sample_dir)?;
        let audio = if doc.get("audio").is_some_and(Value::is_object) {
            &mut doc["audio"]
        } else {
            &mut doc
        };
        let added = add_to_library(audio, &sample_dir, &paths);
        info!(dir = %sample_dir.display(), added, "scanned sample directory");
    }

    let engine = PlaybackEngine::new(
        audio_section(&doc),
        Box::new(CpalHost),
        Arc::new(SourceFetcher::new(sample_dir)),
    );
    let mut middle = Middle::new(doc, engine, args.config.clone());

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let frame_time = Duration::from_millis(16); // ~60fps
    let mut tui_state = tui::mode::TuiState::default();

    'ui: loop {
        let ds = middle.display_state();
        tui_state.playing = ds.playing;
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, tui_state.show_help);
        })?;

        // never block the runtime here; the scheduler shares this thread
        let events = tui::input::poll_input(Duration::ZERO, &mut tui_state)?;
        for event in events {
            if !middle.handle_input(event).await {
                break 'ui;
            }
        }
        tokio::time::sleep(frame_time).await;
    }

    middle.shutdown();
    term.clear()?;
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
