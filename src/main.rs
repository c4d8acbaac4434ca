use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use canvas_merge::config::{DEFAULT_CONFIG_FILE, MergeConfig};
use canvas_merge::core::MergeTarget;
use canvas_merge::report::{MergeSummary, render_detection};
use canvas_merge::telemetry::{self, LogFormat};

/// Three-way merge for layered design documents
///
/// Compares two edited versions of a design document (local and remote)
/// against their common ancestor (base), reports where the edits collide,
/// and writes a merged document with confident resolutions applied.
///
/// Documents are JSON files with a top-level "artboards" array of nodes.
///
/// EXAMPLES:
///
///   # List conflicts as JSON
///   canvas-merge detect base.json mine.json theirs.json
///
///   # Merge into a copy of mine.json, print a summary
///   canvas-merge merge base.json mine.json theirs.json -o merged.json
///
/// Logging goes to stderr and is controlled by CANVAS_MERGE_LOG
/// (e.g. CANVAS_MERGE_LOG=debug).
#[derive(Parser)]
#[command(name = "canvas-merge")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'canvas-merge <command> --help' for more information on a specific command.")]
struct Cli {
    /// Format of log events on stderr
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect conflicts and print them
    ///
    /// Prints the detection report (conflicts and warnings) as JSON.
    /// Exits successfully whether or not conflicts were found.
    Detect {
        #[command(flatten)]
        inputs: Inputs,

        /// Print a human-readable list instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Detect, resolve and write the merged document
    ///
    /// Resolutions that are confident enough are applied to a copy of the
    /// target version. Without --output the merged document goes to stdout
    /// and the summary to stderr.
    ///
    /// Exits non-zero when conflicts remain unresolved and
    /// --fail-on-unresolved (or resolve.fail_on_unresolved) is set.
    Merge {
        #[command(flatten)]
        inputs: Inputs,

        /// Where to write the merged document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Version that receives the resolved values (local or remote)
        #[arg(long)]
        target: Option<MergeTarget>,

        /// Minimum strategy confidence for automatic application
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Fail when any conflict is left for manual review
        #[arg(long)]
        fail_on_unresolved: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct Inputs {
    /// Common ancestor document
    base: PathBuf,
    /// Local (ours) document
    local: PathBuf,
    /// Remote (theirs) document
    remote: PathBuf,

    /// Configuration file (missing file means defaults)
    #[arg(long, env = "CANVAS_MERGE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

struct Loaded {
    base: canvas_merge::core::Document,
    local: canvas_merge::core::Document,
    remote: canvas_merge::core::Document,
    config: MergeConfig,
}

impl Inputs {
    fn load(&self) -> Result<Loaded> {
        Ok(Loaded {
            base: canvas_merge::read_document(&self.base)?,
            local: canvas_merge::read_document(&self.local)?,
            remote: canvas_merge::read_document(&self.remote)?,
            config: MergeConfig::load(&self.config)?,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    match cli.command {
        Commands::Detect { inputs, text } => detect(&inputs, text),
        Commands::Merge {
            inputs,
            output,
            target,
            min_confidence,
            fail_on_unresolved,
            json,
        } => {
            let mut loaded = inputs.load()?;
            let resolve = &mut loaded.config.resolve;
            if let Some(target) = target {
                resolve.target = target;
            }
            if let Some(min_confidence) = min_confidence {
                resolve.min_confidence = min_confidence;
            }
            resolve.fail_on_unresolved |= fail_on_unresolved;
            merge(&loaded, output.as_deref(), json)
        }
    }
}

fn detect(inputs: &Inputs, text: bool) -> Result<()> {
    let loaded = inputs.load()?;
    let report = canvas_merge::detect_conflicts(&loaded.base, &loaded.local, &loaded.remote, &loaded.config)?;
    if text {
        print!("{}", render_detection(&report));
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn merge(loaded: &Loaded, output: Option<&Path>, json: bool) -> Result<()> {
    let result = canvas_merge::merge_documents(&loaded.base, &loaded.local, &loaded.remote, &loaded.config)?;
    let summary = MergeSummary::new(&result, loaded.config.resolve.target);
    let rendered = if json {
        format!("{}\n", serde_json::to_string_pretty(&summary)?)
    } else {
        summary.to_string()
    };

    match output {
        Some(path) => {
            canvas_merge::write_document(path, &result.document)?;
            print!("{rendered}");
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&result.document)?);
            eprint!("{rendered}");
        }
    }

    if !result.success {
        bail!("{} conflict(s) left unresolved", result.unresolved.len());
    }
    Ok(())
}
