//! Rollcall - attendance and roster views for the terminal.
//!
//! Fetches cohort rosters and attendance from the configured services,
//! resolves per-day attendance status and prints sorted roster and
//! dashboard summaries.

mod report;

use std::io;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rollcall_core::aggregate::{average_attendance, comparison_rows};
use rollcall_core::attendance::resolve_day;
use rollcall_core::models::{AttendanceByDate, CohortType, RosterView, SortCriterion};
use rollcall_core::roster::{entry_from_attendance, filter_roster, RosterFilter, SortSelection};
use rollcall_core::{ApiClient, CacheManager, Config};

// ============================================================================
// Constants
// ============================================================================

/// Days of learner history used for roster metrics
const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Days shown by the status command, ending at the selected date
const STATUS_WEEK_DAYS: i64 = 7;

/// Maximum concurrent learner attendance requests
const MAX_CONCURRENT_REQUESTS: usize = 10;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Attendance and roster views for cohorts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    /// Attendance overview (sort by attendance or classes missed)
    Overview,
    /// Class roster (sort by the day's present/absent marks)
    Roster,
}

impl From<ViewArg> for RosterView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Overview => RosterView::AttendanceOverview,
            ViewArg::Roster => RosterView::ClassRoster,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a cohort's learners, sorted and filtered
    Roster {
        #[arg(long)]
        cohort: String,
        /// name-asc, name-desc, attendance-present, attendance-absent,
        /// classes-missed-high|low, attendance-number-high|low
        #[arg(long, default_value = "name-asc")]
        sort: SortCriterion,
        #[arg(long, value_enum, default_value = "overview")]
        view: ViewArg,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        hide_dropouts: bool,
        /// Day whose marks drive the present/absent sort (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
        history_days: i64,
        /// Use cached members instead of fetching
        #[arg(long)]
        offline: bool,
    },
    /// Show the attendance status of the week ending at a date
    Status {
        #[arg(long)]
        cohort: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Show one learner's marks instead of the cohort summary
        #[arg(long)]
        learner: Option<String>,
    },
    /// Compare overall attendance across centres
    Compare {
        #[arg(long, default_value = "regular")]
        center_type: CohortType,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = Config::load()?;
    let api = ApiClient::from_config(&config)?;
    let cache = CacheManager::new(config.cache_dir()?)?;
    let today = Local::now().date_naive();
    info!(base_url = %config.api_base_url, %today, "Rollcall starting");

    match cli.command {
        Commands::Roster {
            cohort,
            sort,
            view,
            search,
            hide_dropouts,
            date,
            history_days,
            offline,
        } => {
            let mut selection = SortSelection::new(view.into());
            selection.select(sort)?;

            let learners = if offline {
                println!("Offline: members cached {}", cache.members_age(&cohort));
                cache.members(&cohort)
            } else {
                let fetched = api.fetch_cohort_members(&cohort, 0, config.page_limit).await;
                cache.members_or_cached(&cohort, fetched)
            };
            let selected = date.unwrap_or(today);
            let from = (today - Duration::days(history_days.max(1))).min(selected);
            let to = today.max(selected);

            let histories = if offline {
                cache.learner_histories(&cohort)
            } else {
                let fetched: Vec<_> = stream::iter(learners.iter().map(|l| l.id.clone()))
                    .map(|user_id| {
                        let api = api.clone();
                        let cohort = cohort.clone();
                        async move {
                            let result = api.fetch_learner_attendance(&cohort, &user_id, from, to).await;
                            (user_id, result)
                        }
                    })
                    .buffer_unordered(MAX_CONCURRENT_REQUESTS)
                    .collect()
                    .await;
                cache.learner_histories_or_cached(&cohort, fetched)
            };

            let no_history = AttendanceByDate::new();
            let entries: Vec<_> = learners
                .into_iter()
                .map(|learner| {
                    let history = histories.get(&learner.id).unwrap_or(&no_history);
                    entry_from_attendance(learner, history, selected, today)
                })
                .collect();
            let filter = RosterFilter {
                query: search,
                hide_dropouts,
            };
            let sorted = selection.apply(&filter_roster(&entries, &filter));
            print!("{}", report::roster_table(&sorted, selection.criterion()));
        }
        Commands::Status {
            cohort,
            date,
            learner,
        } => {
            let end = date.unwrap_or(today);
            let start = end - Duration::days(STATUS_WEEK_DAYS - 1);
            let records = match learner {
                Some(ref user_id) => api.learner_attendance_or_empty(&cohort, user_id, start, end).await,
                None => {
                    let fetched = api.fetch_attendance_by_cohort(&cohort, start, end).await;
                    cache.attendance_or_cached(&cohort, fetched)
                }
            };

            let days: Vec<_> = (0..STATUS_WEEK_DAYS)
                .map(|offset| start + Duration::days(offset))
                .map(|day| resolve_day(day, &records, today, &config.color_bands, config.edit_window_days))
                .collect();
            print!("{}", report::status_table(&days));
        }
        Commands::Compare { center_type } => {
            let user_id = config
                .user_id
                .as_deref()
                .context("user_id must be set in the config to list cohorts")?;
            let cohorts = match api.fetch_cohorts(user_id).await {
                Ok(cohorts) => {
                    if let Err(e) = cache.save_cohorts(&cohorts) {
                        warn!(error = %e, "Failed to cache cohorts");
                    }
                    cohorts
                }
                Err(e) => {
                    warn!(error = %e, "Cohort fetch failed, using cache");
                    cache.load_cohorts().ok().flatten().map(|c| c.data).unwrap_or_default()
                }
            };

            let ids: Vec<String> = cohorts.iter().map(|c| c.id.clone()).collect();
            let percentages = cache.overall_attendance_or_cached(api.fetch_overall_attendance(&ids).await);

            let average = average_attendance(&percentages, ids.len());
            let rows = comparison_rows(&cohorts, &percentages, center_type);
            print!("{}", report::comparison_table(center_type, average, &rows));
        }
    }

    info!("Rollcall done");
    Ok(())
}
