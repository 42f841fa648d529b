//! Batch driver: discover inputs, then square-and-shrink each one.
//!
//! Files are independent. Each runs as its own task on a fixed-size rayon
//! pool, and every task catches its own errors and panics so a bad file
//! never stops its siblings. Only problems with the input path itself
//! ([`PathError`]) abort a run, and they do so before anything is written.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::decode::{self, LoadError, SourceFormat};
use crate::encode::{square_and_shrink, EncodeError, EncodeResult, ShrinkOptions};
use crate::transform::PaddingSpec;

/// Name of the output directory created next to the inputs.
pub const OUTPUT_DIR_NAME: &str = "square_resized";

/// Problems with the input path. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("The specified path '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error(
        "Unsupported file type '{}' (expected one of: {})",
        .0.display(),
        SourceFormat::EXTENSIONS.join(", ")
    )]
    UnsupportedFile(PathBuf),

    #[error("No supported files found in the directory '{}'", .0.display())]
    NoSupportedFiles(PathBuf),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Problems setting up a run after inputs were found.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Options(#[from] EncodeError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A single file that could not be processed. Logged, never fatal.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Failed to encode '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    #[error("Processing '{}' panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },

    #[error(
        "Output '{}' for '{}' is already written from '{}'",
        output.display(),
        path.display(),
        first.display()
    )]
    DuplicateOutput {
        path: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },
}

impl FileError {
    /// The input file this error belongs to.
    pub fn path(&self) -> &Path {
        match self {
            FileError::Load(e) => &e.path,
            FileError::Encode { path, .. }
            | FileError::Panicked { path, .. }
            | FileError::DuplicateOutput { path, .. } => path,
        }
    }
}

/// Worker count used when none is given: all cores but one, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Everything a run needs besides the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub padding: PaddingSpec,
    pub shrink: ShrinkOptions,
    /// Worker threads; values below one are treated as one.
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            padding: PaddingSpec::default(),
            shrink: ShrinkOptions::default(),
            workers: default_workers(),
        }
    }
}

/// Files to process and where their outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSet {
    /// Supported input files, sorted by name.
    pub files: Vec<PathBuf>,
    /// `square_resized` beside the inputs. Not created yet.
    pub output_dir: PathBuf,
}

/// Resolve `path` (a file or a directory) into the files to process.
///
/// Directories are scanned one level deep. Symlinks are followed; entries
/// that cannot be read (such as dangling links) are logged and skipped.
/// Nothing is created on disk.
pub fn collect_inputs(path: &Path) -> Result<InputSet, PathError> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => PathError::NotFound(path.to_path_buf()),
        _ => PathError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        if SourceFormat::from_path(path).is_none() {
            return Err(PathError::UnsupportedFile(path.to_path_buf()));
        }
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        return Ok(InputSet {
            files: vec![path.to_path_buf()],
            output_dir: parent.join(OUTPUT_DIR_NAME),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                let skipped = e.path().unwrap_or(path).to_path_buf();
                log::warn!("Skipping {}: {}", skipped.display(), e);
                continue;
            }
            Err(e) => {
                return Err(PathError::Io {
                    path: path.to_path_buf(),
                    source: e.into(),
                })
            }
        };
        if entry.file_type().is_file() && SourceFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(PathError::NoSupportedFiles(path.to_path_buf()));
    }

    Ok(InputSet {
        files,
        output_dir: path.join(OUTPUT_DIR_NAME),
    })
}

/// Output location for `input`. HEIF sources get a `.jpg` extension.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let name = input.file_name().map(PathBuf::from).unwrap_or_default();
    match SourceFormat::from_path(input) {
        Some(format) if !format.keeps_extension() => output_dir.join(name.with_extension("jpg")),
        _ => output_dir.join(name),
    }
}

/// Give each input its output path, in input order.
///
/// When two inputs map to the same output, JPEG sources (which keep their
/// name) win over HEIF sources, then the earlier input wins. The losers get
/// [`FileError::DuplicateOutput`].
pub fn assign_outputs(files: &[PathBuf], output_dir: &Path) -> Vec<Result<PathBuf, FileError>> {
    let mut order: Vec<usize> = (0..files.len()).collect();
    order.sort_by_key(|&i| {
        let keeps = SourceFormat::from_path(&files[i]).map_or(true, SourceFormat::keeps_extension);
        !keeps
    });

    let mut claimed: HashMap<PathBuf, usize> = HashMap::with_capacity(files.len());
    let mut assigned: Vec<Option<Result<PathBuf, FileError>>> =
        (0..files.len()).map(|_| None).collect();
    for i in order {
        let output = output_path_for(&files[i], output_dir);
        let result = match claimed.get(&output) {
            Some(&first) => Err(FileError::DuplicateOutput {
                path: files[i].clone(),
                output,
                first: files[first].clone(),
            }),
            None => {
                claimed.insert(output.clone(), i);
                Ok(output)
            }
        };
        assigned[i] = Some(result);
    }
    assigned.into_iter().flatten().collect()
}

/// Load, pad, shrink and write a single file.
pub fn process_file(
    input: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<EncodeResult, FileError> {
    process_to(input, &output_path_for(input, output_dir), options)
}

fn process_to(
    input: &Path,
    output: &Path,
    options: &BatchOptions,
) -> Result<EncodeResult, FileError> {
    log::info!("Processing file: {}", input.display());

    let image = decode::load(input)?;
    square_and_shrink(&image, output, &options.padding, &options.shrink).map_err(|source| {
        FileError::Encode {
            path: input.to_path_buf(),
            source,
        }
    })
}

/// Result for one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<EncodeResult, FileError>,
}

/// Results of a run, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Files written within budget.
    pub fn succeeded(&self) -> usize {
        self.written().filter(|r| r.within_budget).count()
    }

    /// Files written at the minimum quality but still over budget.
    pub fn over_budget(&self) -> usize {
        self.written().filter(|r| !r.within_budget).count()
    }

    /// Files that could not be processed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    fn written(&self) -> impl Iterator<Item = &EncodeResult> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Process every file in `inputs` on a pool of `options.workers` threads.
///
/// The output directory is created here, after discovery has succeeded.
/// Per-file failures end up in the report; only setup problems are errors.
/// Inputs whose output name is taken by another input are skipped, see
/// [`assign_outputs`].
pub fn run_batch(inputs: &InputSet, options: &BatchOptions) -> Result<BatchReport, BatchError> {
    options.shrink.validate()?;

    fs::create_dir_all(&inputs.output_dir).map_err(|source| BatchError::OutputDir {
        path: inputs.output_dir.clone(),
        source,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()?;

    let jobs: Vec<(&PathBuf, Result<PathBuf, FileError>)> = inputs
        .files
        .iter()
        .zip(assign_outputs(&inputs.files, &inputs.output_dir))
        .collect();
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        jobs.into_par_iter()
            .map(|(input, output)| FileOutcome {
                input: input.clone(),
                result: match output {
                    Ok(output) => isolate(input, || process_to(input, &output, options)),
                    Err(e) => {
                        log::warn!("Skipping {}: {}", input.display(), e);
                        Err(e)
                    }
                },
            })
            .collect()
    });

    Ok(BatchReport {
        output_dir: inputs.output_dir.clone(),
        outcomes,
    })
}

/// Run one task, turning a panic into a [`FileError`] and logging the result.
fn isolate<F>(input: &Path, task: F) -> Result<EncodeResult, FileError>
where
    F: FnOnce() -> Result<EncodeResult, FileError>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(FileError::Panicked {
            path: input.to_path_buf(),
            message,
        })
    });

    match &result {
        Ok(done) => log::info!(
            "Saved {} ({}x{}, quality {}, {} bytes)",
            done.path.display(),
            done.width,
            done.height,
            done.quality,
            done.size_bytes
        ),
        Err(e) => log::warn!("Skipping {}: {}", input.display(), e),
    }
    result
}
