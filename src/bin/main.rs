use annotator_core::autosave::AutoSaver;
use annotator_core::core::terms::DEFAULT_PAGE_SIZE;
use annotator_core::core::types::{Record, RecordIndex, NO_CORRECT_CANDIDATE};
use annotator_core::{AnnotatorError, Ledger, LedgerConfig};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::io::{stdin, stdout, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SAVE_INTERVAL_ENV: &str = "ANNOTATOR_SAVE_INTERVAL_SECS";

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: annotator <records.jsonl[.gz]>");
        return ExitCode::FAILURE;
    };

    let mut config = LedgerConfig::new(path);
    if let Some(secs) = std::env::var(SAVE_INTERVAL_ENV).ok().and_then(|s| s.parse().ok()) {
        config = config.with_save_interval(Duration::from_secs(secs));
    }

    // Nothing to annotate without a dataset.
    let ledger = match Ledger::open(&config) {
        Ok(ledger) => Arc::new(ledger),
        Err(err) => {
            error!(error = %err, "could not load records");
            return ExitCode::FAILURE;
        }
    };

    let saver = match AutoSaver::spawn(Arc::clone(&ledger), config.save_interval) {
        Ok(saver) => saver,
        Err(err) => {
            error!(error = %err, "could not start periodic save");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_console(&ledger) {
        warn!(error = %err, "console stopped");
    }

    saver.stop();
    info!("saving before exit");
    match ledger.save() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "final save failed");
            ExitCode::FAILURE
        }
    }
}

fn run_console(ledger: &Ledger) -> std::io::Result<()> {
    let mut status = String::new();
    loop {
        let current = match ledger.pick_unanswered() {
            Ok(index) => Some(index),
            Err(AnnotatorError::NothingToDo) => None,
            Err(err) => return Err(std::io::Error::other(err)),
        };
        let record = current.and_then(|index| ledger.get_record(index).ok());
        print_ui(ledger, current.zip(record.as_ref()), &status)?;

        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let cmd = input.trim();

        status = match cmd {
            "exit" => return Ok(()),
            "" => String::from("Skipped."),
            "save" => match ledger.save() {
                Ok(()) => String::from("Saved."),
                Err(err) => format!("Save failed: {err}"),
            },
            s if s == "terms" || s.starts_with("terms ") => {
                let from = s["terms".len()..].trim().parse().unwrap_or(0);
                match ledger.list_terms(from, DEFAULT_PAGE_SIZE) {
                    Ok(terms) => terms
                        .iter()
                        .map(|t| format!("  {:>5}  {}", t.freq, t.term))
                        .collect::<Vec<_>>()
                        .join("\n"),
                    Err(err) => err.to_string(),
                }
            }
            s if s.starts_with("term ") => {
                let term = s["term ".len()..].trim();
                match ledger.lookup_term(term, 0, DEFAULT_PAGE_SIZE) {
                    Ok(page) => {
                        let mut lines = vec![format!(
                            "{:?}: {} occurrences, {} restricted",
                            page.term, page.total, page.restricted_total
                        )];
                        lines.extend(page.occurrences.iter().map(|o| {
                            format!(
                                "  #{} {} {}{}",
                                o.index,
                                o.source_id.as_deref().unwrap_or("-"),
                                if o.restricted { "[restricted] " } else { "" },
                                if o.answered { "answered" } else { "open" },
                            )
                        }));
                        lines.join("\n")
                    }
                    Err(err) => err.to_string(),
                }
            }
            s => match (current, record.as_ref()) {
                (Some(index), Some(record)) => answer(ledger, index, record, s),
                _ => String::from("Nothing left to annotate. Type 'exit' to save and quit."),
            },
        };
    }
}

/// Handles ':N' (choose candidate N) and '?' (no correct candidate).
fn answer(ledger: &Ledger, index: RecordIndex, record: &Record, cmd: &str) -> String {
    let golden = if cmd == NO_CORRECT_CANDIDATE {
        NO_CORRECT_CANDIDATE.to_string()
    } else if let Some(n) = cmd.strip_prefix(':').and_then(|n| n.parse::<usize>().ok()) {
        match n.checked_sub(1).and_then(|i| record.candidates.get(i)) {
            Some(candidate) => candidate.id.clone(),
            None => return format!("No candidate {n}."),
        }
    } else {
        return format!("Unknown command {cmd:?}.");
    };

    match ledger.submit_answer(index, golden) {
        Ok(done) => format!("Record #{index} answered ({done} done)."),
        Err(err) => format!("Not stored: {err}"),
    }
}

fn print_ui(
    ledger: &Ledger,
    current: Option<(RecordIndex, &Record)>,
    status: &str,
) -> std::io::Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let stats = ledger.statistics();
    writeln!(out, "Annotator: {} done, {} to do", stats.done, stats.todo)?;
    writeln!(out, "---------------------------------------------------------------")?;
    writeln!(out, "Choose with ':1', ':2', '?' for none, [Enter] to skip.")?;
    writeln!(out, "'terms [from]', 'term <input>', 'save'. 'exit' to save and quit.\n")?;

    match current {
        Some((index, record)) => {
            writeln!(out, "Record #{index}: {}", record.input)?;
            if let Some(kind) = &record.kind {
                writeln!(out, "Type: {kind}")?;
            }
            for (i, candidate) in record.candidates.iter().enumerate() {
                writeln!(
                    out,
                    "  :{}: {} [{}] (distance: {})",
                    i + 1,
                    candidate.names.join(" / "),
                    candidate.id,
                    candidate.distance
                )?;
            }
        }
        None => writeln!(out, "Every record has been answered.")?,
    }

    if !status.is_empty() {
        writeln!(out, "\n{status}")?;
    }
    write!(out, "\n> ")?;
    out.flush()
}
