//! Command-line interface: scanning, reviewing and reporting on CiliaQ result directories

use crate::io::archive::{GroupArchive, SessionSummary};
use crate::io::configuration::{
    ConfigSources, CurationConfig, HISTORY_TIME_FORMAT, MONTAGE_DIR_NAME,
};
use crate::io::error::{Result, fs_error, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::io::terminal::TerminalHost;
use crate::render::thumbnail::ThumbnailRenderer;
use crate::session::builder::{Exclusion, SessionBuilder};
use crate::session::controller::{FinalizeOptions, ReviewController, ReviewOutcome};
use crate::session::discovery::{Bundle, LoadFailure, discover};
use crate::session::group::{group_path, next_group, peek_next_group};
use crate::session::host::ReviewHost;
use crate::session::layout::GridLayout;
use crate::session::state::{GroupInfo, SessionState};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cilia-curate")]
#[command(
    author,
    version,
    about = "Blinded review of CiliaQ cilia ROIs with in-place curation of the result files"
)]
/// Command-line arguments for the curation tool
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Extra configuration file merged over the defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore the per-user configuration file
    #[arg(long, global = true)]
    pub no_user_config: bool,

    /// Suppress progress output and all logs but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
}

/// Subcommands
#[derive(Subcommand)]
pub enum Command {
    /// List the result files and crop images found in directories
    Scan(ScanArgs),
    /// Review ROIs and comment out the rejected ones
    Review(ReviewArgs),
    /// Show the progress of a multi-session review
    Status(StatusArgs),
}

/// Arguments of `scan`
#[derive(Args)]
pub struct ScanArgs {
    /// Directories holding `_CQ.txt` files
    #[arg(value_name = "DIR", required = true)]
    pub dirs: Vec<PathBuf>,
}

/// Arguments of `review`
#[derive(Args)]
// Each flag maps to an independent user choice
#[allow(clippy::struct_excessive_bools)]
pub struct ReviewArgs {
    /// Directories holding `_CQ.txt` files; state and results go into the first
    #[arg(value_name = "DIR", required = true)]
    pub dirs: Vec<PathBuf>,

    /// Random seed for reproducible session order
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Minimum ROIs per session, 0 for a single session
    #[arg(long)]
    pub roi_per_session: Option<usize>,

    /// Offer rows that are already commented out
    #[arg(long)]
    pub revisit_culled: bool,

    /// Add a dated line to the History section of rewritten files
    #[arg(long)]
    pub history: bool,

    /// Review, list the changes, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore a saved session plan and start a new group
    #[arg(long)]
    pub fresh: bool,

    /// Print cell numbers only, without rendering montages
    #[arg(long)]
    pub no_montage: bool,

    /// Leave out result files by bundle id or file name glob; repeatable
    #[arg(long, value_name = "GLOB|ID")]
    pub exclude: Vec<String>,
}

/// Arguments of `status`
#[derive(Args)]
pub struct StatusArgs {
    /// Directory a review was started in
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Everything needed to run the sessions of a review
pub struct ReviewPlan {
    /// Options in effect
    pub config: CurationConfig,
    /// Directory holding the state file and the group directory
    pub source: PathBuf,
    /// Loaded bundles
    pub bundles: Vec<Bundle>,
    /// Files that could not be loaded
    pub failures: Vec<LoadFailure>,
    /// Saved or freshly planned sessions
    pub state: SessionState,
    /// Incomplete sessions as `(id, bundle indices)`
    pub pending: Vec<(usize, Vec<usize>)>,
    /// True when a saved plan is being continued
    pub resumed: bool,
    /// Review without writing
    pub dry_run: bool,
    builder: SessionBuilder,
}

/// Totals of a review run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Group number of the plan
    pub group: u32,
    /// Sessions in the plan
    pub sessions: usize,
    /// Sessions completed, including earlier runs
    pub completed: usize,
    /// Files whose rewrite failed in this run
    pub failed_files: usize,
    /// True when the reviewer stopped early
    pub cancelled: bool,
}

fn emit(out: &mut impl Write, text: &str) -> Result<()> {
    writeln!(out, "{text}").map_err(fs_error(Path::new("<stdout>"), "write"))
}

/// Orchestrates the subcommands with progress tracking
pub struct CurationProcessor {
    cli: Cli,
    progress_manager: ProgressManager,
}

impl CurationProcessor {
    /// Create a new processor with the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = if cli.should_show_progress() {
            ProgressManager::new()
        } else {
            ProgressManager::hidden()
        };

        Self {
            cli,
            progress_manager,
        }
    }

    /// Run the selected subcommand on the process standard streams
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, discovery, review or writing fails
    pub fn process(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.process_with(stdin.lock(), stdout.lock())
    }

    /// Run the selected subcommand reading reviewer input from `input`
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, discovery, review or writing fails
    pub fn process_with<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        let result = match &self.cli.command {
            Command::Scan(args) => self.scan(args, &mut output),
            Command::Status(args) => Self::status(args, &mut output),
            Command::Review(args) => match self.prepare_review(args)? {
                None => emit(&mut output, "No CiliaQ result files found"),
                Some(mut plan) => {
                    if args.no_montage {
                        let mut host = TerminalHost::text_only(input, output);
                        Self::run_review(&mut plan, &mut host).map(|_| ())
                    } else {
                        let montages = plan.state.group.path.join(MONTAGE_DIR_NAME);
                        let mut host = TerminalHost::new(input, output, montages);
                        Self::run_review(&mut plan, &mut host).map(|_| ())
                    }
                }
            },
        };
        self.progress_manager.finish();
        result
    }

    fn config_for(&self, dir: &Path) -> Result<CurationConfig> {
        CurationConfig::load(&ConfigSources {
            input_dir: Some(dir.to_path_buf()),
            explicit: self.cli.config.clone(),
            skip_user: self.cli.no_user_config,
        })
    }

    fn scan(&self, args: &ScanArgs, out: &mut impl Write) -> Result<()> {
        let discovery = discover(&args.dirs, Some(&self.progress_manager))?;

        for bundle in &discovery.bundles {
            let document = bundle.document();
            emit(
                out,
                &format!(
                    "{:>4}  {}  ROIs={} culled={} image={}",
                    bundle.id(),
                    bundle.roi_path().display(),
                    document.records().len(),
                    document.culled_count(),
                    bundle
                        .image_path()
                        .map_or_else(|| "missing".to_owned(), |p| p.display().to_string())
                ),
            )?;
        }
        for failure in &discovery.failures {
            emit(out, &format!("skipped {}: {}", failure.path.display(), failure.error))?;
        }
        emit(
            out,
            &format!(
                "{} files, {} ROIs, {} skipped",
                discovery.bundles.len(),
                discovery.record_count(),
                discovery.failures.len()
            ),
        )
    }

    fn status(args: &StatusArgs, out: &mut impl Write) -> Result<()> {
        let Some(state) = SessionState::load(&args.dir)? else {
            return emit(
                out,
                &format!("No review planned in {}", args.dir.display()),
            );
        };

        emit(
            out,
            &format!(
                "Group #{} ({}): {} of {} sessions completed",
                state.group.number,
                state.group.path.display(),
                state.completed(),
                state.sessions.len()
            ),
        )?;
        for session in &state.sessions {
            let records: usize = session.bundles.iter().map(|bundle| bundle.records).sum();
            emit(
                out,
                &format!(
                    "  session #{}: {} files, {} ROIs, {}",
                    session.id,
                    session.bundles.len(),
                    records,
                    if session.complete { "complete" } else { "pending" }
                ),
            )?;
        }
        Ok(())
    }

    /// Load the inputs and build or resume the session plan
    ///
    /// Returns `None` when no result files were found.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a directory cannot
    /// be read, or a saved plan no longer matches the files
    pub fn prepare_review(&self, args: &ReviewArgs) -> Result<Option<ReviewPlan>> {
        let source = args
            .dirs
            .first()
            .cloned()
            .ok_or_else(|| invalid_parameter("dirs", &"", &"at least one directory is required"))?;

        let mut config = self.config_for(&source)?;
        if let Some(roi_per_session) = args.roi_per_session {
            config.roi_per_session = roi_per_session;
        }
        config.revisit_culled |= args.revisit_culled;
        config.record_history |= args.history;
        config.validate()?;
        let exclusion = Exclusion::parse(&args.exclude)?;

        let discovery = discover(&args.dirs, Some(&self.progress_manager))?;
        if discovery.bundles.is_empty() {
            return Ok(None);
        }

        let saved = if args.fresh {
            None
        } else {
            SessionState::load(&source)?.filter(|state| !state.is_finished())
        };

        if let Some(state) = saved {
            let pending = state.pending(&source, &discovery.bundles)?;
            let config = state.options.clone();
            if !exclusion.is_empty() {
                tracing::warn!("exclusions only apply to new plans, pass --fresh to replan");
            }
            tracing::info!(
                group = state.group.number,
                remaining = pending.len(),
                "resuming saved review"
            );
            return Ok(Some(ReviewPlan {
                builder: SessionBuilder::from_seed(&config, args.seed),
                config,
                source,
                bundles: discovery.bundles,
                failures: discovery.failures,
                state,
                pending,
                resumed: true,
                dry_run: args.dry_run,
            }));
        }

        let mut builder = SessionBuilder::from_seed(&config, args.seed).excluding(exclusion);
        let partition = builder.partition(&discovery.bundles);
        let group = if args.dry_run {
            let number = peek_next_group(&source)?;
            GroupInfo {
                number,
                path: group_path(&source, number),
            }
        } else {
            let (number, path) = next_group(&source)?;
            GroupInfo { number, path }
        };

        let state = SessionState::plan(group, config.clone(), &partition, &discovery.bundles);
        if !args.dry_run {
            state.save(&source)?;
        }
        let pending = partition
            .into_iter()
            .enumerate()
            .map(|(index, members)| (index + 1, members))
            .collect();

        Ok(Some(ReviewPlan {
            config,
            source,
            bundles: discovery.bundles,
            failures: discovery.failures,
            state,
            pending,
            resumed: false,
            dry_run: args.dry_run,
            builder,
        }))
    }

    /// Run every pending session of `plan` on `host`
    ///
    /// Stops at the first cancelled or declined session. Completed sessions
    /// are recorded in the state file so a later run resumes after them.
    ///
    /// # Errors
    ///
    /// Returns host errors, or an error if the state file cannot be saved
    pub fn run_review<H: ReviewHost + ?Sized>(
        plan: &mut ReviewPlan,
        host: &mut H,
    ) -> Result<ReviewSummary> {
        let layout = GridLayout::new(&plan.config)?;
        let sessions = plan.state.sessions.len();
        let mut summary = ReviewSummary {
            group: plan.state.group.number,
            sessions,
            completed: plan.state.completed(),
            failed_files: 0,
            cancelled: false,
        };

        for failure in &plan.failures {
            host.notify(&format!(
                "Skipped {}: {}",
                failure.path.display(),
                failure.error
            ))?;
        }

        let archive = (plan.config.archive && !plan.dry_run)
            .then(|| GroupArchive::new(&plan.state.group.path, &plan.config));
        if let Some(archive) = &archive {
            std::fs::create_dir_all(archive.dir()).map_err(fs_error(archive.dir(), "create directory"))?;
            archive.write_header(&plan.source, &plan.config, Local::now())?;
        }

        for (id, members) in plan.pending.clone() {
            let session = plan.builder.session(id, members, &plan.bundles);
            host.notify(&format!(
                "Session #{id} of {sessions}: {} ROIs",
                session.len()
            ))?;

            let mut controller = ReviewController::new(
                session,
                &plan.bundles,
                layout,
                ThumbnailRenderer::new(&plan.config),
            );
            if controller.run(host)? == ReviewOutcome::Cancelled {
                host.notify("Session cancelled, no files were changed")?;
                summary.cancelled = true;
                break;
            }

            let changes = controller.plan()?;
            if plan.dry_run {
                if changes.is_empty() {
                    host.notify("Dry run: no file would change")?;
                }
                for change in &changes {
                    host.notify(&format!(
                        "Dry run: {} would reject [{}]",
                        change.path.display(),
                        change.rejected.join(", ")
                    ))?;
                }
                continue;
            }

            if !changes.is_empty() && !host.confirm(&changes)? {
                controller.cancel()?;
                host.notify("Changes discarded, the session stays pending")?;
                summary.cancelled = true;
                break;
            }

            if let Some(archive) = &archive {
                for change in &changes {
                    if let Some(bundle) = plan.bundles.iter().find(|b| b.id() == change.bundle) {
                        archive.store_original(bundle)?;
                    }
                }
            }

            let options = FinalizeOptions {
                history_stamp: plan
                    .config
                    .record_history
                    .then(|| Local::now().format(HISTORY_TIME_FORMAT).to_string()),
            };
            let report = controller.finalize(&options)?;

            if let Some(archive) = &archive {
                for change in &report.written {
                    let Some(index) = plan.bundles.iter().position(|b| b.id() == change.bundle)
                    else {
                        continue;
                    };
                    let stored = plan
                        .bundles
                        .get(index)
                        .map(|bundle| archive.store(bundle, &controller.decisions_for(index)));
                    if let Some(Err(error)) = stored {
                        tracing::warn!(%error, "archive copy failed");
                        host.notify(&format!("Archive copy failed: {error}"))?;
                    }
                }
                archive.append_session(&SessionSummary {
                    session: id,
                    sessions,
                    finished: Local::now(),
                    report: &report,
                })?;
            }

            for change in &report.written {
                host.notify(&format!(
                    "Updated {}: {} rejected, {} restored",
                    change.path.display(),
                    change.rejected.len(),
                    change.restored.len()
                ))?;
            }
            for failure in &report.failed {
                host.notify(&format!(
                    "Could not update {}: {}",
                    failure.path.display(),
                    failure.error
                ))?;
            }

            if report.is_complete() {
                plan.state.mark_complete(id);
                plan.state.save(&plan.source)?;
                summary.completed += 1;
            } else {
                summary.failed_files += report.failed.len();
            }
        }

        host.notify(&format!(
            "{} of {} sessions completed for group #{}",
            summary.completed, summary.sessions, summary.group
        ))?;
        Ok(summary)
    }
}
