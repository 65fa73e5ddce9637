use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::blocking::Client;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use gtfs_nest_core::{
    default_pipeline, nest_input_with, unique_service_ids, write_documents, CheckpointWriter,
    GtfsFeed, GtfsInput, OutputFormat, ProgressHandler,
};

#[derive(Debug, Parser)]
#[command(name = "gtfs-nest")]
#[command(about = "Convert a GTFS feed into route-oriented nested JSON")]
struct Args {
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    #[arg(short = 's', long = "storage_directory", alias = "storage-directory")]
    storage_directory: Option<PathBuf>,

    #[arg(short = 'o', long = "output_base", alias = "output", default_value = ".")]
    output: PathBuf,

    #[arg(long = "output_name", alias = "output-name", default_value = "routes.json")]
    output_name: String,

    #[arg(short = 'p', long = "pretty")]
    pretty: bool,

    /// Write one route per line instead of a single JSON array
    #[arg(long = "json_lines", alias = "json-lines")]
    json_lines: bool,

    /// Dump the document after every stage into <output_base>/checkpoints
    #[arg(long = "checkpoints")]
    checkpoints: bool,

    /// Print the distinct service ids referenced by trips.txt and exit
    #[arg(long = "show_service_ids", alias = "show-service-ids")]
    show_service_ids: bool,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let input = resolve_input(&args)?;
    info!("input {:?} detected", input.source());

    if args.show_service_ids {
        let feed = GtfsFeed::from_input(&input)
            .with_context(|| format!("load feed {}", input.path().display()))?;
        for service_id in unique_service_ids(&feed) {
            println!("{}", service_id);
        }
        return Ok(());
    }

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("create output dir {}", args.output.display()))?;

    let checkpoints = if args.checkpoints {
        let dir = args.output.join("checkpoints");
        Some(
            CheckpointWriter::new(&dir)
                .with_context(|| format!("create checkpoint dir {}", dir.display()))?,
        )
    } else {
        None
    };

    let runner = default_pipeline();
    let progress = if args.quiet {
        None
    } else {
        Some(IndicatifHandler::new())
    };
    let started_at = Instant::now();
    let outcome = nest_input_with(
        &input,
        &runner,
        progress.as_ref().map(|handler| handler as &dyn ProgressHandler),
        checkpoints.as_ref(),
    )
    .with_context(|| format!("nest feed {}", input.path().display()))?;
    if let Some(progress) = progress.as_ref() {
        progress.finish();
    }

    let format = if args.json_lines {
        OutputFormat::JsonLines
    } else {
        OutputFormat::Json
    };
    let output_path = args.output.join(&args.output_name);
    write_documents(&output_path, &outcome.routes, format, args.pretty)
        .with_context(|| format!("write {}", output_path.display()))?;

    info!(
        "nested {} routes from {} in {:?}",
        outcome.routes.len(),
        input.path().display(),
        started_at.elapsed()
    );
    Ok(())
}

fn resolve_input(args: &Args) -> anyhow::Result<GtfsInput> {
    match (&args.input, &args.url) {
        (Some(_), Some(_)) => {
            bail!("--input and --url cannot be provided at the same time");
        }
        (None, None) => {
            bail!("one of --input or --url must be provided");
        }
        (Some(path), None) => {
            if args.storage_directory.is_some() {
                bail!("--storage_directory requires --url");
            }
            GtfsInput::from_path(path).with_context(|| format!("load input {}", path.display()))
        }
        (None, Some(url)) => {
            if url.trim().is_empty() {
                bail!("--url must not be empty");
            }
            let (download_dir, file_name) = match args.storage_directory.clone() {
                Some(dir) => {
                    std::fs::create_dir_all(&dir).with_context(|| {
                        format!("create storage directory {}", dir.display())
                    })?;
                    (dir, download_file_name(url))
                }
                None => (
                    std::env::temp_dir(),
                    format!("gtfs_download_{}_{}.zip", std::process::id(), unique_suffix()),
                ),
            };
            let download_path = download_dir.join(file_name);
            download_url_to_path(url, &download_path)?;
            GtfsInput::from_path(&download_path)
                .with_context(|| format!("load input {}", download_path.display()))
        }
    }
}

fn download_file_name(url: &str) -> String {
    let trimmed = url.split('?').next().unwrap_or(url);
    let candidate = trimmed
        .rsplit('/')
        .next()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or("gtfs.zip");
    if candidate.to_ascii_lowercase().ends_with(".zip") {
        candidate.to_string()
    } else {
        format!("{}.zip", candidate)
    }
}

fn download_url_to_path(url: &str, path: &Path) -> anyhow::Result<()> {
    let client = Client::builder()
        .user_agent(format!("gtfs-nest/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("download gtfs from {}", url))?
        .error_for_status()
        .with_context(|| format!("download gtfs from {}", url))?;
    let mut file =
        std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    std::io::copy(&mut response, &mut file).with_context(|| format!("write {}", path.display()))?;
    info!("downloaded {} to {}", url, path.display());
    Ok(())
}

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

struct IndicatifHandler {
    _multi: MultiProgress,
    loading_pb: ProgressBar,
    stage_pb: ProgressBar,
}

impl IndicatifHandler {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let loading_pb = multi.add(ProgressBar::new(0));
        loading_pb.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {percent}% {msg}",
        ));
        loading_pb.set_message("Waiting to load files...");

        let stage_pb = multi.add(ProgressBar::new(0));
        stage_pb.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.magenta/magenta} {percent}% {msg}",
        ));
        stage_pb.set_message("Waiting to nest...");

        Self {
            _multi: multi,
            loading_pb,
            stage_pb,
        }
    }

    fn finish(&self) {
        self.loading_pb.finish_with_message("Tables loaded");
        self.stage_pb.finish_with_message("Document nested");
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

impl ProgressHandler for IndicatifHandler {
    fn on_start_file_load(&self, file: &str) {
        self.loading_pb.set_message(format!("Loading {}", file));
    }

    fn on_finish_file_load(&self, file: &str, rows: usize) {
        self.loading_pb
            .set_message(format!("Loaded {} rows from {}", rows, file));
        self.loading_pb.inc(1);
    }

    fn set_total_files(&self, count: usize) {
        self.loading_pb.set_length(count as u64);
        self.loading_pb.set_message("Starting load...");
    }

    fn set_total_stages(&self, count: usize) {
        self.stage_pb.set_length(count as u64);
        self.stage_pb.set_message("Starting pipeline...");
    }

    fn on_start_stage(&self, stage: &str) {
        self.stage_pb.set_message(format!("Running {}", stage));
    }

    fn on_finish_stage(&self, _stage: &str) {
        self.stage_pb.inc(1);
    }
}
