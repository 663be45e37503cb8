use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medrem_core::auto_skip::run_auto_skip;
use medrem_core::catalog::default_times;
use medrem_core::projection::{find_log, group_by_status, group_by_time};
use medrem_core::time::{
    format_for_display, is_valid_display_time, minutes_until, parse_display_to_storage, parse_time,
};
use medrem_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "medrem")]
#[command(about = "Medication schedule and dose tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,

    /// Pretend the time is this (HH:MM, 24h)
    #[arg(long, global = true, value_parser = parse_time_arg)]
    at: Option<TimeOfDay>,

    /// Log auto-skip decisions and store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's doses grouped by status (default)
    Today {
        /// Do not convert superseded missed doses to skipped first
        #[arg(long)]
        no_auto_skip: bool,
    },

    /// Record a scheduled dose as taken
    Take {
        /// Medication id
        id: String,
        /// Scheduled time of the dose
        time: String,
    },

    /// Record a scheduled dose as skipped
    Skip {
        /// Medication id
        id: String,
        /// Scheduled time of the dose
        time: String,
        /// Why the dose was skipped
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Add a medication
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dosage: String,
        /// once, twice, thrice, four or asNeeded
        #[arg(long, default_value = "once")]
        frequency: String,
        /// Dose times; defaults to the configured times for the frequency
        #[arg(long = "time")]
        times: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Change a medication
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        /// Replace all dose times
        #[arg(long = "time")]
        times: Vec<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
    },

    /// Remove a medication (its history is kept)
    Remove { id: String },

    /// List all medications
    List,

    /// Show dose history, newest day first
    History {
        /// Write the history to a CSV file instead
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Import medications from a JSON file of the form {"data": [...]}
    Import { file: PathBuf },

    /// Show the reminders a notification service should schedule
    Reminders,

    /// Re-run auto-skip on a fixed interval
    Watch {
        /// Seconds between passes (defaults to the configured interval)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many passes
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn parse_time_arg(s: &str) -> std::result::Result<TimeOfDay, String> {
    parse_time(s).map_err(|e| e.to_string())
}

/// Files under the data directory
struct Paths {
    catalog: PathBuf,
    logs: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            catalog: data_dir.join("medications.json"),
            logs: data_dir.join("logs").join("medication_logs.jsonl"),
        }
    }
}

/// Everything a command needs
struct App {
    config: Config,
    clock: Box<dyn Clock>,
    catalog: CatalogStore,
    logs: JsonlLogStore,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep stdout for command output
    medrem_core::logging::init_with_level(if cli.verbose { "debug" } else { "warn" });

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let paths = Paths::new(&data_dir);

    let clock: Box<dyn Clock> = if cli.date.is_some() || cli.at.is_some() {
        let system = SystemClock;
        Box::new(FixedClock::at(
            cli.date.unwrap_or_else(|| system.today()),
            cli.at.unwrap_or_else(|| system.time_of_day()),
        ))
    } else {
        Box::new(SystemClock)
    };

    let app = App {
        config,
        clock,
        catalog: CatalogStore::new(paths.catalog),
        logs: JsonlLogStore::new(paths.logs),
    };

    match cli.command {
        Some(Commands::Today { no_auto_skip }) => cmd_today(&app, no_auto_skip),
        Some(Commands::Take { id, time }) => cmd_record(&app, &id, &time, None),
        Some(Commands::Skip { id, time, reason }) => cmd_record(&app, &id, &time, Some(&reason)),
        Some(Commands::Add {
            name,
            dosage,
            frequency,
            times,
            notes,
        }) => cmd_add(&app, name, dosage, &frequency, &times, notes),
        Some(Commands::Edit {
            id,
            name,
            dosage,
            frequency,
            times,
            notes,
            clear_notes,
        }) => {
            let notes = if clear_notes { Some(None) } else { notes.map(Some) };
            cmd_edit(&app, &id, name, dosage, frequency.as_deref(), &times, notes)
        }
        Some(Commands::Remove { id }) => cmd_remove(&app, &id),
        Some(Commands::List) => cmd_list(&app),
        Some(Commands::History { csv }) => cmd_history(&app, csv.as_deref()),
        Some(Commands::Import { file }) => cmd_import(&app, &file),
        Some(Commands::Reminders) => cmd_reminders(&app),
        Some(Commands::Watch {
            interval_secs,
            ticks,
        }) => cmd_watch(&app, interval_secs, ticks),
        None => {
            // Default to "today" command
            cmd_today(&app, false)
        }
    }
}

/// Parse a time typed by the user: 24h storage form or the display form.
fn parse_user_time(input: &str, format: TimeFormat) -> Result<TimeOfDay> {
    if let Ok(time) = parse_time(input) {
        return Ok(time);
    }
    if !is_valid_display_time(input, format) {
        return Err(Error::Validation(format!(
            "invalid time '{}': use HH:MM or the display format (e.g. {})",
            input,
            format_for_display(TimeOfDay::EIGHT_AM, format)
        )));
    }
    parse_display_to_storage(input, format)
}

fn parse_user_times(inputs: &[String], format: TimeFormat) -> Result<Vec<TimeOfDay>> {
    inputs.iter().map(|s| parse_user_time(s, format)).collect()
}

fn show(app: &App, time: TimeOfDay) -> String {
    format_for_display(time, app.config.display.time_format)
}

/// Run one auto-skip pass against the stored log; returns the entries written.
fn reconcile(app: &App, catalog: &Catalog, logs: &mut Vec<MedicationLog>) -> Result<usize> {
    let mut sink = JsonlLogStore::new(app.logs.path());
    let written = run_auto_skip(&catalog.medications, logs, &mut sink, app.clock.as_ref())?;
    let count = written.len();
    logs.extend(written);
    Ok(count)
}

fn cmd_today(app: &App, no_auto_skip: bool) -> Result<()> {
    let catalog = app.catalog.load(app.clock.as_ref())?;
    let mut logs = app.logs.read_all()?;

    if app.config.auto_skip.enabled && !no_auto_skip {
        let skipped = reconcile(app, &catalog, &mut logs)?;
        if skipped > 0 {
            println!("Auto-skipped {} missed dose(s)\n", skipped);
        }
    }

    let today = app.clock.today();
    let now = app.clock.time_of_day();
    let projected = project_doses_for_date(&catalog.medications, &logs, today, now);
    let groups = group_by_status(&projected);

    println!("Doses for {} at {}", today, show(app, now));

    if groups.is_empty() {
        println!("\nNo medications scheduled for today");
        return Ok(());
    }

    if !groups.upcoming.is_empty() {
        println!("\nUpcoming Doses");
        for (time, doses) in group_by_time(&groups.upcoming) {
            let when = if doses[0].status == DoseStatus::Current {
                "due now".to_string()
            } else {
                format!("in {}", minutes_until(time, now))
            };
            println!("  {} ({})", show(app, time), when);
            for dose in doses {
                print_dose(&dose.dose);
            }
        }
    }

    for (heading, doses) in [
        ("Taken", &groups.taken),
        ("Missed", &groups.missed),
        ("Skipped", &groups.skipped),
    ] {
        if doses.is_empty() {
            continue;
        }
        println!("\n{}", heading);
        for projected in doses {
            println!("  {}", show(app, projected.dose.scheduled_time));
            print_dose(&projected.dose);
        }
    }

    Ok(())
}

fn print_dose(dose: &Dose) {
    println!("    {} ({})  [{}]", dose.name, dose.dosage, dose.medication_id);
    if let Some(notes) = &dose.notes {
        println!("      {}", notes);
    }
}

fn cmd_record(app: &App, id: &str, time: &str, reason: Option<&str>) -> Result<()> {
    if let Some(reason) = reason {
        actions::validate_skip_reason(reason)?;
    }

    let catalog = app.catalog.load(app.clock.as_ref())?;
    let medication = catalog.require(id)?;
    let time = parse_user_time(time, app.config.display.time_format)?;
    if !medication.times.contains(&time) {
        return Err(Error::Validation(format!(
            "{} is not scheduled at {}",
            medication.name,
            show(app, time)
        )));
    }

    let today = app.clock.today();
    let logs = app.logs.read_all()?;
    if let Some(existing) = find_log(&logs, id, time, today) {
        return Err(Error::Validation(format!(
            "the {} dose of {} is already recorded as {}",
            show(app, time),
            medication.name,
            DoseStatus::from(existing.status)
        )));
    }

    let entry = match reason {
        Some(reason) => record_skipped(id, time, today, reason.trim(), app.clock.as_ref()),
        None => record_taken(id, time, today, app.clock.as_ref()),
    };
    let mut sink = JsonlLogStore::new(app.logs.path());
    sink.append(&entry)?;

    let verb = if reason.is_some() { "skipped" } else { "taken" };
    println!(
        "✓ {} ({}) at {} marked as {}",
        medication.name,
        medication.dosage,
        show(app, time),
        verb
    );
    Ok(())
}

fn cmd_add(
    app: &App,
    name: String,
    dosage: String,
    frequency: &str,
    times: &[String],
    notes: Option<String>,
) -> Result<()> {
    let frequency: Frequency = frequency.parse()?;
    let times = if times.is_empty() {
        default_times(frequency, &app.config.schedule)
    } else {
        parse_user_times(times, app.config.display.time_format)?
    };

    let draft = MedicationDraft {
        name,
        dosage,
        frequency,
        times,
        notes,
    };

    let clock = app.clock.as_ref();
    let medication = app
        .catalog
        .update(clock, |catalog| catalog.add(draft, clock).cloned())?;

    println!("✓ Added {} ({})", medication.name, medication.id);
    Ok(())
}

fn cmd_edit(
    app: &App,
    id: &str,
    name: Option<String>,
    dosage: Option<String>,
    frequency: Option<&str>,
    times: &[String],
    notes: Option<Option<String>>,
) -> Result<()> {
    let frequency = frequency.map(str::parse::<Frequency>).transpose()?;
    let times = if !times.is_empty() {
        Some(parse_user_times(times, app.config.display.time_format)?)
    } else {
        // A new frequency without explicit times takes the configured defaults
        frequency.map(|f| default_times(f, &app.config.schedule))
    };

    let patch = MedicationPatch {
        name,
        dosage,
        frequency,
        times,
        notes,
    };

    let clock = app.clock.as_ref();
    let medication = app
        .catalog
        .update(clock, |catalog| catalog.update(id, patch, clock).cloned())?;

    println!("✓ Updated {} ({})", medication.name, medication.id);
    Ok(())
}

fn cmd_remove(app: &App, id: &str) -> Result<()> {
    let removed = app
        .catalog
        .update(app.clock.as_ref(), |catalog| catalog.remove(id))?;
    println!("✓ Removed {} ({})", removed.name, removed.id);
    Ok(())
}

fn cmd_list(app: &App) -> Result<()> {
    let catalog = app.catalog.load(app.clock.as_ref())?;
    if catalog.medications.is_empty() {
        println!("No medications");
        return Ok(());
    }

    for med in &catalog.medications {
        let schedule = if med.is_scheduled() {
            med.sorted_times()
                .into_iter()
                .map(|t| show(app, t))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "as needed".to_string()
        };
        println!("{}  {} ({})", med.id, med.name, med.dosage);
        println!("    {}: {}", med.frequency, schedule);
        if let Some(notes) = &med.notes {
            println!("    {}", notes);
        }
    }
    Ok(())
}

fn cmd_history(app: &App, csv: Option<&Path>) -> Result<()> {
    let catalog = app.catalog.load(app.clock.as_ref())?;
    let logs = app.logs.read_all()?;

    if let Some(path) = csv {
        let count = history::export_csv(&logs, &catalog, path)?;
        println!("✓ Exported {} entries to {}", count, path.display());
        return Ok(());
    }

    if logs.is_empty() {
        println!("No history yet");
        return Ok(());
    }

    for (date, entries) in history::group_logs_by_date(&logs) {
        println!("{}", date);
        for log in entries {
            let mut line = format!(
                "  {}  {}  {}",
                show(app, log.scheduled_time),
                history::medication_name(&catalog, &log.medication_id),
                DoseStatus::from(log.status)
            );
            if let Some(actual) = log.actual_time {
                line.push_str(&format!(" at {}", show(app, actual)));
            }
            if let Some(reason) = &log.skip_reason {
                line.push_str(&format!(" ({})", reason));
            }
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_import(app: &App, file: &Path) -> Result<()> {
    let clock = app.clock.as_ref();
    let count = app
        .catalog
        .update(clock, |catalog| import::import_file(catalog, file, clock))?;
    println!("✓ Imported {} medications", count);
    Ok(())
}

fn cmd_reminders(app: &App) -> Result<()> {
    let catalog = app.catalog.load(app.clock.as_ref())?;
    let reminders = reminder::schedule_all(&catalog, &app.config.notifications, app.clock.as_ref());

    if reminders.is_empty() {
        println!("No reminders scheduled");
        return Ok(());
    }

    for r in reminders {
        println!(
            "{} {}  {}: {}",
            r.next_fire.date(),
            show(app, r.time),
            r.title,
            r.body
        );
    }
    Ok(())
}

fn cmd_watch(app: &App, interval_secs: Option<u64>, ticks: Option<u64>) -> Result<()> {
    if !app.config.auto_skip.enabled {
        println!("Auto-skip is disabled in the configuration");
        return Ok(());
    }

    let interval = std::time::Duration::from_secs(
        interval_secs.unwrap_or(app.config.auto_skip.interval_secs).max(1),
    );
    let mut tick = 0u64;

    loop {
        // Reload each pass so edits made by other commands are picked up
        let catalog = app.catalog.load(app.clock.as_ref())?;
        let mut logs = app.logs.read_all()?;
        let skipped = reconcile(app, &catalog, &mut logs)?;
        println!(
            "{} {}: auto-skipped {} dose(s)",
            app.clock.today(),
            show(app, app.clock.time_of_day()),
            skipped
        );

        tick += 1;
        if ticks.is_some_and(|limit| tick >= limit) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}
