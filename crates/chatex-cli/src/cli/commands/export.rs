//! `chatex export` – write the HTML report, then download the chat's media.

use anyhow::{Context, Result};
use chatex_core::archive::ChatArchive;
use chatex_core::config::ChatexConfig;
use chatex_core::export;
use chatex_core::media::{extract_jobs, JobId};
use chatex_core::scheduler::{self, BatchOptions, ChannelSink, ProgressStats};
use chatex_core::transfer::CurlOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::cli::ExportArgs;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const MIB: f64 = 1_048_576.0;

pub async fn run_export(args: &ExportArgs, cfg: &ChatexConfig) -> Result<()> {
    let mode = args.fetch_mode()?;
    let archive = ChatArchive::load(&args.archive)?;
    let chat = archive.find_chat(args.selector())?;
    let fetched = chat.fetch(mode, &CurlOptions::from_config(cfg));

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| cfg.export.output_file.clone());
    match export::write_report(&output, &chat.name, &fetched.records)? {
        Some(path) => println!(
            "Exported {} message(s) from \"{}\" to {}",
            fetched.records.len(),
            chat.name,
            path.display()
        ),
        None => println!("No messages to export."),
    }

    if args.no_media {
        return Ok(());
    }
    let jobs = extract_jobs(&fetched.media);
    if jobs.is_empty() {
        println!("No media to download.");
        return Ok(());
    }

    let opts = BatchOptions {
        max_concurrent: args.jobs.unwrap_or(cfg.download.max_concurrent_downloads),
        download_dir: args
            .download_dir
            .clone()
            .unwrap_or_else(|| cfg.download.download_path.clone()),
    };
    if opts.max_concurrent == 0 {
        println!("Media downloads disabled (max concurrent downloads is 0).");
        return Ok(());
    }
    println!(
        "Downloading {} media file(s) to {} ({} at a time)",
        jobs.len(),
        opts.download_dir.display(),
        opts.max_concurrent
    );

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressStats>(256);
    let printer = tokio::spawn(print_progress(progress_rx));
    let batch = scheduler::run_batch(jobs, &opts, Arc::new(ChannelSink::new(progress_tx))).await;
    let _ = printer.await;
    let result = batch.context("media batch aborted")?;

    let summary = result.summary();
    println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    for (job_id, reason) in &summary.failures {
        println!("  Msg {}: {}", job_id, reason);
    }
    Ok(())
}

/// Prints progress lines through a [`ProgressThrottle`].
async fn print_progress(mut rx: mpsc::Receiver<ProgressStats>) {
    let mut throttle = ProgressThrottle::new(PROGRESS_INTERVAL);
    while let Some(stats) = rx.recv().await {
        if throttle.should_print(&stats, Instant::now()) {
            println!("{}", format_progress(&stats));
        }
    }
}

/// Per-job print throttle: at most one line per job per interval, and always
/// the job's final line.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_print: HashMap<JobId, Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_print: HashMap::new(),
        }
    }

    pub fn should_print(&mut self, stats: &ProgressStats, now: Instant) -> bool {
        if stats.finished {
            self.last_print.remove(&stats.job_id);
            return true;
        }
        match self.last_print.get(&stats.job_id) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                self.last_print.insert(stats.job_id, now);
                true
            }
        }
    }
}

/// One console line for a progress render.
pub fn format_progress(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / MIB;
    let rate_mib = stats.bytes_per_sec() / MIB;
    let mut line = match stats.fraction() {
        Some(fraction) => format!(
            "  {}: {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s",
            stats.label,
            done_mib,
            stats.total_bytes as f64 / MIB,
            fraction * 100.0,
            rate_mib
        ),
        None => format!("  {}: {:.1} MiB  {:.2} MiB/s", stats.label, done_mib, rate_mib),
    };
    if stats.finished {
        line.push_str("  done");
    } else {
        let eta = stats
            .eta_secs()
            .map(|s| format!("{:.0}s", s))
            .unwrap_or_else(|| "?".to_string());
        line.push_str(&format!("  ETA {}", eta));
    }
    line
}
