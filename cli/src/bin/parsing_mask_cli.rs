use clap::{Parser, Subcommand};
use cli::MaskJobFile;
use color_eyre::eyre::{Result, WrapErr};
use parsing_mask::{ingest, labels, Label, MaskService, Selection};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one inpainting mask from a parsing map
    Generate {
        /// Parsing map PNG (indexed, grayscale label ids or palette colours)
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the grayscale mask PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Label ids to inpaint, overrides --target-groups
        #[arg(long, value_delimiter = ',')]
        target_labels: Option<Vec<u32>>,
        /// Groups to inpaint (clothing, body, head)
        #[arg(long, value_delimiter = ',')]
        target_groups: Option<Vec<String>>,
        /// Label ids forced to 0 in the final mask
        #[arg(long, value_delimiter = ',')]
        protect_labels: Option<Vec<u32>>,
        /// Groups forced to 0 in the final mask
        #[arg(long, value_delimiter = ',')]
        protect_groups: Option<Vec<String>>,
    },
    /// Run every job of a TOML or JSON job file
    Process {
        /// Path to the job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the labels present in a parsing map
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
        /// Write a palette-coloured rendering of the map
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// List the label taxonomy and groups
    Labels,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            target_labels,
            target_groups,
            protect_labels,
            protect_groups,
        } => {
            let service = MaskService::new();
            generate_one(
                &service,
                &input,
                &output,
                &Selection::new(target_labels, target_groups),
                &Selection::new(protect_labels, protect_groups),
            )?;
        }
        Commands::Process { config } => process_jobs(&config)?,
        Commands::Inspect { input, preview } => inspect(&input, preview.as_deref())?,
        Commands::Labels => print_labels(),
    }

    Ok(())
}

fn generate_one(
    service: &MaskService,
    input: &Path,
    output: &Path,
    target: &Selection,
    protect: &Selection,
) -> Result<()> {
    let parsing = ingest::load_file(input)
        .wrap_err_with(|| format!("failed to read parsing map {}", input.display()))?;
    let mask = service.generate_for(&parsing, target, protect)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, ingest::encode_png(&mask)?)?;
    info!("{} -> {} ({}x{})", input.display(), output.display(), mask.width(), mask.height());
    Ok(())
}

fn process_jobs(config_path: &Path) -> Result<()> {
    let job_file = MaskJobFile::from_file(config_path)
        .wrap_err_with(|| format!("failed to load job file {}", config_path.display()))?;
    info!("Loaded {} job(s) from {}", job_file.jobs.len(), config_path.display());

    let service = match &job_file.params {
        Some(params) => MaskService::with_params(params.clone())?,
        None => MaskService::new(),
    };
    debug!(params = ?service.generator().params(), "engine parameters");
    std::fs::create_dir_all(&job_file.output_dir)?;

    let mut failed = 0;
    for job in &job_file.jobs {
        let output = job_file.output_path(job);
        info!("Processing job '{}'", job.name);
        if let Err(e) = generate_one(&service, &job.input, &output, &job.target(), &job.protect()) {
            error!("Job '{}' failed: {:?}", job.name, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(color_eyre::eyre::eyre!("{} of {} job(s) failed", failed, job_file.jobs.len()));
    }
    info!("Mask processing completed");
    Ok(())
}

fn inspect(input: &Path, preview: Option<&Path>) -> Result<()> {
    let parsing = ingest::load_file(input)
        .wrap_err_with(|| format!("failed to read parsing map {}", input.display()))?;
    let total = parsing.width() as f64 * parsing.height() as f64;

    println!("{}: {}x{}", input.display(), parsing.width(), parsing.height());
    for (id, count) in parsing.label_histogram() {
        let name = Label::from_id(id).map(|label| label.to_string()).unwrap_or_else(|| "unknown".into());
        println!("{:>3} {:<14} {:>9} px {:>6.2}%", id, name, count, count as f64 * 100.0 / total);
    }

    if let Some(path) = preview {
        ingest::colorize(&parsing).save(path)?;
        info!("Preview written to {}", path.display());
    }
    Ok(())
}

fn print_labels() {
    for label in Label::iter() {
        let [r, g, b] = labels::palette_color(label.id());
        println!("{:>3} {:<14} #{:02x}{:02x}{:02x}", label.id(), label.to_string(), r, g, b);
    }
    println!();
    for group in parsing_mask::LabelGroup::iter() {
        let ids: Vec<String> = group.labels().iter().map(|id| id.to_string()).collect();
        println!("{:<9} {}", group.to_string(), ids.join(","));
    }
}
