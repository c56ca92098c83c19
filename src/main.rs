use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;

use layerdiff::notifier::Notifier;
use layerdiff::runtime::{self, Options, SourceKind};
use layerdiff::ViewMode;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Source {
    Docker,
    Tar,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum View {
    /// One layer's changes against the layers below it
    Layer,
    /// Every layer above the base folded together
    Aggregated,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(help = "Image to analyze (e.g., alpine:3.20, or a tarball path with --source tar)")]
    image: String,

    #[arg(
        short,
        long,
        value_enum,
        default_value = "docker",
        help = "Where to get the image from"
    )]
    source: Source,

    #[arg(long, help = "Directory for stored analyses, reused across runs")]
    cache_dir: Option<PathBuf>,

    #[arg(short, long, help = "Write the analysis as JSON to this file")]
    export: Option<PathBuf>,

    #[arg(long, value_enum, help = "List the tree for a layer in this view")]
    view: Option<View>,

    #[arg(short, long, help = "Layer index to list (defaults to the top layer)")]
    layer: Option<usize>,

    #[arg(short, long, help = "Only list paths that changed")]
    changes_only: bool,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace). Also switches to text-based progress"
    )]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            image: self.image.clone(),
            source: match self.source {
                Source::Docker => SourceKind::Docker,
                Source::Tar => SourceKind::Tar,
            },
            cache_dir: self.cache_dir.clone(),
            export_file: self.export.clone(),
            view: self.view.map(|view| match view {
                View::Layer => ViewMode::Layer,
                View::Aggregated => ViewMode::Aggregated,
            }),
            layer: self.layer,
            changes_only: self.changes_only,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let notifier = Notifier::new(cli.verbose);
    notifier.init_logging();

    let options = cli.options();
    debug!("Options: {:?}", options);
    debug!("Progress bars: {}", notifier.use_progress_bars());

    let result = runtime::run(&options, &notifier);
    notifier.finish();
    result
}
