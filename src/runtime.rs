//! One command-line run: fetch, analyze (or reuse a stored analysis), report,
//! and optionally list the derived tree for a layer.

use crate::analysis::AnalysisResult;
use crate::export::ExportDocument;
use crate::filetree::{TreeStackCache, ViewMode};
use crate::image::ImageArchive;
use crate::notifier::Notifier;
use crate::render;
use crate::sources::{DockerSource, Source, TarSource};
use crate::store;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Docker,
    Tar,
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Image reference or tarball path, depending on `source`.
    pub image: String,
    pub source: SourceKind,
    /// Where analysis records are kept between runs; `None` disables reuse.
    pub cache_dir: Option<PathBuf>,
    /// Writes the JSON export and skips the tree listing.
    pub export_file: Option<PathBuf>,
    pub view: Option<ViewMode>,
    pub layer: Option<usize>,
    pub changes_only: bool,
}

impl Options {
    pub fn new(image: impl Into<String>, source: SourceKind) -> Self {
        Self {
            image: image.into(),
            source,
            cache_dir: None,
            export_file: None,
            view: None,
            layer: None,
            changes_only: false,
        }
    }

    fn wants_tree(&self) -> bool {
        self.view.is_some() || self.layer.is_some()
    }
}

pub fn run(options: &Options, notifier: &Notifier) -> Result<()> {
    match options.source {
        SourceKind::Docker => run_with_source(&DockerSource::new()?, options, notifier),
        SourceKind::Tar => run_with_source(&TarSource::new()?, options, notifier),
    }
}

fn run_with_source<S: Source>(source: &S, options: &Options, notifier: &Notifier) -> Result<()> {
    notifier.info(&format!(
        "Getting image '{}' using {} source...",
        options.image,
        source.name()
    ));
    let (tarball_path, _tarball_temp_dir) = source.get_image_tarball(&options.image, notifier)?;

    let analysis = analyze_image(&tarball_path, options.cache_dir.as_deref(), notifier)?;
    notifier.finish();
    notifier.println(render::render_summary(&analysis));

    if let Some(export_file) = &options.export_file {
        ExportDocument::new(&analysis).to_file(export_file)?;
        notifier.println(format!("Exported analysis to {}", export_file.display()));
        return Ok(());
    }

    if options.wants_tree() {
        let listing = render_layer(&analysis, options, notifier)?;
        notifier.println(listing);
    }

    Ok(())
}

/// Analysis for the image in `tarball_path`, reusing a stored record from
/// `cache_dir` when one exists for the same image digest.
pub fn analyze_image(
    tarball_path: &Path,
    cache_dir: Option<&Path>,
    notifier: &Notifier,
) -> Result<AnalysisResult> {
    let image = ImageArchive::from_tarball(tarball_path, notifier)
        .with_context(|| format!("Failed to open image tarball: {}", tarball_path.display()))?;
    let digest = image.metadata().id.clone();

    if let Some(dir) = cache_dir {
        match store::load(dir, &digest) {
            Ok(Some(analysis)) => {
                notifier.info(&format!("Using stored analysis for {}", digest));
                return Ok(analysis);
            }
            Ok(None) => {}
            Err(e) => notifier.warn(&format!("Ignoring stored analysis: {:#}", e)),
        }
    }

    notifier.info("Analyzing image...");
    let analysis = AnalysisResult::analyze(&image, notifier)?;

    if let Some(dir) = cache_dir {
        let path = store::save(dir, &analysis)?;
        notifier.debug(&format!("Stored analysis at {}", path.display()));
    }

    Ok(analysis)
}

/// Warms both view modes, then lists the tree for the chosen layer.
pub fn render_layer(analysis: &AnalysisResult, options: &Options, notifier: &Notifier) -> Result<String> {
    let layer_count = analysis.ref_trees.len();
    if layer_count == 0 {
        return Err(anyhow!("Image has no filesystem layers"));
    }

    let view = options.view.unwrap_or(ViewMode::Aggregated);
    let layer = options.layer.unwrap_or(layer_count - 1);

    let cache = TreeStackCache::new(analysis.ref_trees.clone());
    warm_cache(&cache, notifier)?;

    let key = view.key(layer);
    notifier.debug(&format!("Rendering {:?} view of layer {} with key {}", view, layer, key));
    let tree = cache.get(key)?;

    let stats = cache.stats();
    notifier.debug(&format!(
        "Cache: {} trees, {} merges, {} compares, {} hits",
        cache.len(),
        stats.merges,
        stats.compares,
        stats.hits
    ));

    Ok(render::render_tree(&tree, options.changes_only))
}

fn warm_cache(cache: &TreeStackCache, notifier: &Notifier) -> Result<()> {
    let total = 2 * cache.layer_count() as u64;

    notifier.info("Building cache...");
    let bar = notifier.progress_bar(total, "Building cache");
    let mut done = 0;
    cache.build_with(|_| {
        done += 1;
        notifier.progress(done, total, "Building cache");
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    })?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(())
}
