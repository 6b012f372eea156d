mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use readalong_core::extraction::ocr::DEFAULT_OCR_DPI;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "readalong",
    version,
    about = "Read a PDF aloud while highlighting the words being read"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
pub struct OcrArgs {
    /// Rasterization resolution for the OCR fallback
    #[arg(long, value_name = "DPI", default_value_t = DEFAULT_OCR_DPI)]
    pub ocr_dpi: u32,

    /// Never fall back to OCR for documents without a text layer
    #[arg(long)]
    pub no_ocr: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text and word geometry from a PDF
    Analyze {
        /// Path to PDF file
        pdf_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the analyzed document to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Align every sentence or word against the page geometry, without playback
    Align {
        /// Path to PDF file
        pdf_file: PathBuf,

        /// Highlight granularity: word (default) or sentence
        #[arg(short, long, default_value = "word")]
        mode: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Read a PDF, printing each highlight as it happens (Ctrl-C stops)
    Read {
        /// Path to PDF file
        pdf_file: PathBuf,

        /// Highlight granularity: word or sentence
        #[arg(short, long)]
        mode: Option<String>,

        /// What drives advancement: speech or timer
        #[arg(short, long)]
        follow: Option<String>,

        /// Reading speed for timer pacing and the speech engine
        #[arg(long)]
        wpm: Option<u32>,

        /// Zoom level recommended with each highlight
        #[arg(long)]
        zoom: Option<f32>,

        /// JSON settings file; flags override its values
        #[arg(short, long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Speech program taking the text as its last argument (default: espeak-ng)
        #[arg(long, value_name = "PROG")]
        speech_cmd: Option<String>,

        /// Print highlight events as JSON lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Print the default reader settings as JSON
    Settings,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            pdf_file,
            output,
            out,
            ocr,
        } => commands::analyze::run(pdf_file, &output, out, ocr),
        Commands::Align {
            pdf_file,
            mode,
            output,
            ocr,
        } => commands::align::run(pdf_file, &mode, &output, ocr),
        Commands::Read {
            pdf_file,
            mode,
            follow,
            wpm,
            zoom,
            settings,
            speech_cmd,
            json,
            ocr,
        } => {
            let overrides = commands::read::Overrides {
                mode,
                follow,
                wpm,
                zoom,
            };
            commands::read::run(pdf_file, settings, overrides, speech_cmd, json, ocr).await
        }
        Commands::Settings => commands::settings::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
