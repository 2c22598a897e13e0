use colored::*;
use futures_util::{stream, StreamExt};
use slug::slugify;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::discovery;
use crate::error::ConvertError;
use crate::frontmatter::SourceDocument;
use crate::merge::{self, MergeSection};
use crate::metadata::{self, ResolvedMetadata};
use crate::request::{ConversionRequest, OutputMode};

/// Upper bound on simultaneously running converter processes. Concurrency is
/// an optimization only; a limit of 1 must produce the same summary.
const MAX_CONCURRENT_JOBS: usize = 4;

/// The external document converter, seen from the core: hand over a logical
/// document and an output path, get back success or a human-readable reason.
#[allow(async_fn_in_trait)]
pub trait EbookConverter {
    async fn convert(&self, document: &LogicalDocument, output: &Path) -> Result<(), String>;
}

/// One unit to be converted: the final body, the source files it came from,
/// resolved metadata, and the stylesheet to embed.
#[derive(Debug, Clone)]
pub struct LogicalDocument {
    pub sources: Vec<PathBuf>,
    pub body: String,
    pub metadata: ResolvedMetadata,
    pub stylesheet: Option<PathBuf>,
}

/// A logical document paired with its target output path.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub document: LogicalDocument,
    pub output: PathBuf,
}

/// Terminal outcome of one unit, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded {
        unit: String,
        artifact: PathBuf,
    },
    Failed {
        unit: String,
        sources: Vec<PathBuf>,
        reason: String,
    },
}

impl JobOutcome {
    pub fn unit(&self) -> &str {
        match self {
            JobOutcome::Succeeded { unit, .. } | JobOutcome::Failed { unit, .. } => unit,
        }
    }
}

/// Everything the presentation layer gets to see after a run: one outcome
/// per unit (conversion jobs and excluded files alike) plus the counts.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<JobOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Succeeded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// A run counts as successful when at least one unit made it through.
    pub fn is_success(&self) -> bool {
        self.succeeded() > 0
    }
}

/// Run the whole pipeline: discover, load, resolve, assemble, convert.
pub async fn run<C: EbookConverter>(
    request: &ConversionRequest,
    converter: &C,
) -> Result<RunSummary, ConvertError> {
    run_with_limit(request, converter, MAX_CONCURRENT_JOBS).await
}

/// Same as [`run`] with an explicit concurrency bound.
///
/// Fatal errors (`NoInputFiles`, `MissingAuthor` for a merged book) abort
/// before any job is dispatched. Everything unit-local lands in the summary
/// and never takes sibling units down with it.
pub async fn run_with_limit<C: EbookConverter>(
    request: &ConversionRequest,
    converter: &C,
    limit: usize,
) -> Result<RunSummary, ConvertError> {
    let paths = discovery::discover(&request.inputs, request.recursive).await?;

    // Load every ordered source; files with unreadable content or malformed
    // frontmatter are excluded here and reported, not silently dropped.
    let mut excluded = Vec::new();
    let mut documents = Vec::new();
    for path in &paths {
        match SourceDocument::load(path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                warn!("Excluding {}: {}", path.display().to_string().blue(), e);
                excluded.push(JobOutcome::Failed {
                    unit: path.display().to_string(),
                    sources: vec![path.clone()],
                    reason: e.to_string(),
                });
            }
        }
    }

    if documents.is_empty() {
        return Ok(RunSummary { outcomes: excluded });
    }

    let (jobs, unresolved) = plan_jobs(request, &documents)?;

    let mut resolved: Vec<(usize, JobOutcome)> = stream::iter(jobs.into_iter().enumerate())
        .map(|(index, job)| async move {
            let unit = job.document.metadata.title.clone();
            info!(
                "Converting \"{}\" into \"{}\"",
                unit.green(),
                job.output.display().to_string().blue()
            );
            let outcome = match converter.convert(&job.document, &job.output).await {
                Ok(()) => JobOutcome::Succeeded {
                    unit,
                    artifact: job.output,
                },
                Err(reason) => {
                    let err = ConvertError::Conversion {
                        unit: unit.clone(),
                        reason,
                    };
                    warn!("{}", err);
                    JobOutcome::Failed {
                        unit,
                        sources: job.document.sources,
                        reason: err.to_string(),
                    }
                }
            };
            (index, outcome)
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    // Single aggregation point: outcomes are folded back into job order so
    // concurrent and sequential runs report identically.
    resolved.sort_by_key(|(index, _)| *index);

    let mut outcomes = excluded;
    outcomes.extend(unresolved);
    outcomes.extend(resolved.into_iter().map(|(_, outcome)| outcome));

    Ok(RunSummary { outcomes })
}

/// Turn loaded documents into conversion jobs.
///
/// Batch mode resolves each file against its own frontmatter; a unit without
/// an author is skipped and reported. Merge and single mode build exactly
/// one unit from the first document's frontmatter, and a missing author
/// there is fatal for the run.
fn plan_jobs(
    request: &ConversionRequest,
    documents: &[SourceDocument],
) -> Result<(Vec<ConversionJob>, Vec<JobOutcome>), ConvertError> {
    let mut jobs = Vec::new();
    let mut unresolved = Vec::new();
    let mut used_outputs = HashSet::new();

    match request.mode {
        OutputMode::Batch => {
            for doc in documents {
                match metadata::resolve(request, &doc.frontmatter, &doc.path) {
                    Ok(meta) => {
                        let output = output_path(
                            request.out_dir.as_deref(),
                            source_dir(&doc.path),
                            &meta.title,
                            &mut used_outputs,
                        );
                        jobs.push(ConversionJob {
                            document: LogicalDocument {
                                sources: vec![doc.path.clone()],
                                body: doc.body.clone(),
                                metadata: meta,
                                stylesheet: request.stylesheet.clone(),
                            },
                            output,
                        });
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", doc.path.display().to_string().blue(), e);
                        unresolved.push(JobOutcome::Failed {
                            unit: metadata::title_from_filename(&doc.path),
                            sources: vec![doc.path.clone()],
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        OutputMode::Single | OutputMode::Merge => {
            let first = &documents[0];
            let fallback = title_fallback(request, first);
            let meta = metadata::resolve(request, &first.frontmatter, &fallback)?;

            let (body, native, synthesized) =
                if request.mode == OutputMode::Merge || documents.len() > 1 {
                    let sections: Vec<MergeSection<'_>> = documents
                        .iter()
                        .map(|doc| MergeSection {
                            title: metadata::chapter_title(&doc.frontmatter, &doc.path),
                            body: &doc.body,
                        })
                        .collect();
                    let merged = merge::assemble(&sections);
                    (
                        merged.body,
                        merged.native_chapters,
                        merged.synthesized_chapters,
                    )
                } else {
                    (first.body.clone(), 0, 0)
                };

            if documents.len() > 1 {
                info!(
                    "Merged {} document(s): {} native and {} synthesized chapter boundaries",
                    documents.len(),
                    native,
                    synthesized
                );
            }

            let output = output_path(
                request.out_dir.as_deref(),
                source_dir(&first.path),
                &meta.title,
                &mut used_outputs,
            );
            jobs.push(ConversionJob {
                document: LogicalDocument {
                    sources: documents.iter().map(|d| d.path.clone()).collect(),
                    body,
                    metadata: meta,
                    stylesheet: request.stylesheet.clone(),
                },
                output,
            });
        }
    }

    Ok((jobs, unresolved))
}

/// Seed path for the default title of a merged book: the input the user
/// named (a directory's name reads better than its first file), falling
/// back to the first document.
fn title_fallback(request: &ConversionRequest, first: &SourceDocument) -> PathBuf {
    if request.inputs.len() == 1 {
        request.inputs[0].clone()
    } else {
        first.path.clone()
    }
}

fn source_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Compute a collision-free output path from a unit title. Colliding titles
/// within one run get a numeric suffix rather than overwriting each other.
fn output_path(
    out_dir: Option<&Path>,
    default_dir: &Path,
    title: &str,
    used: &mut HashSet<PathBuf>,
) -> PathBuf {
    let dir = out_dir.unwrap_or(default_dir);

    let mut base = slugify(title);
    if base.is_empty() {
        base = "untitled".to_string();
    }

    let mut candidate = dir.join(format!("{base}.epub"));
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = dir.join(format!("{base}-{counter}.epub"));
        counter += 1;
    }
    used.insert(candidate.clone());

    candidate
}
