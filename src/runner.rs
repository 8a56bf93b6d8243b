use std::sync::Arc;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{RunMode, Settings};
use crate::digest::{self, FormatOptions};
use crate::model::{DealCandidate, RawItem, RunReport};
use crate::pipeline::classify::Strictness;
use crate::pipeline::dedup::{dedup, dedup_key, DedupStore};
use crate::pipeline::rank::{rank, select_above};
use crate::pipeline::{extract_candidates, ExtractOptions};
use crate::sources::SourceAdapter;
use crate::telegram::DeliveryGateway;

#[derive(Debug, Clone, Copy)]
enum RunState {
    Fetching,
    Extracting,
    Deduplicating,
    Ranking,
    Formatting,
    Delivering,
    Idle,
}

/// A rendered message and the dedup keys it covers.
struct Outgoing {
    text: String,
    keys: Vec<String>,
}

/// One scheduled run: fetch → extract → dedup → rank → format → deliver.
pub struct Runner {
    settings: Settings,
    adapter: Arc<dyn SourceAdapter>,
    gateway: Arc<dyn DeliveryGateway>,
}

impl Runner {
    pub fn new(settings: Settings, adapter: Arc<dyn SourceAdapter>, gateway: Arc<dyn DeliveryGateway>) -> Self {
        Self {
            settings,
            adapter,
            gateway,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn run_once(&self, store: &DedupStore) -> RunReport {
        let started_at = Utc::now();
        let mut report = RunReport {
            run_id: format!("run-{}", started_at.format("%Y%m%dT%H%M%S")),
            started_at: Some(started_at),
            sources: self.settings.sources.len(),
            ..RunReport::default()
        };
        let run_id = report.run_id.clone();
        store.begin_run();

        self.enter(&run_id, RunState::Fetching);
        let batches = self.fetch_all().await;
        report.raw_items = batches.iter().map(|(_, items)| items.len()).sum();

        self.enter(&run_id, RunState::Extracting);
        let opts = ExtractOptions::from(&self.settings);
        let candidates = extract_candidates(&batches, &opts);
        report.candidates = candidates.len();

        self.enter(&run_id, RunState::Deduplicating);
        let unique = dedup(candidates, self.settings.dedup_key_len, store);
        report.unique = unique.len();

        info!(
            run_id = %run_id,
            raw_items = report.raw_items,
            candidates = report.candidates,
            unique = report.unique,
            "extraction finished"
        );

        self.enter(&run_id, RunState::Ranking);
        let selected = match self.settings.mode {
            RunMode::Batch => rank(unique, self.settings.top_k),
            RunMode::Stream => select_above(unique, self.settings.min_discount),
        };
        report.selected = selected.len();

        self.enter(&run_id, RunState::Formatting);
        let outbox = self.format(&selected);

        self.enter(&run_id, RunState::Delivering);
        self.deliver(outbox, store, &mut report).await;

        self.enter(&run_id, RunState::Idle);
        info!(
            run_id = %run_id,
            selected = report.selected,
            sent = report.sent,
            failed = report.failed,
            elapsed_ms = (Utc::now() - started_at).num_milliseconds(),
            "run complete"
        );
        report
    }

    fn enter(&self, run_id: &str, state: RunState) {
        debug!(run_id, state = ?state, "run state");
    }

    /// Fetch every source concurrently; results come back in source order.
    async fn fetch_all(&self) -> Vec<(Strictness, Vec<RawItem>)> {
        let sources = &self.settings.sources;
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches));
        let fetch_timeout = self.settings.fetch_timeout();
        let deadline = Instant::now() + self.settings.run_deadline();
        let pb = progress_bar(sources.len());

        let mut tasks = JoinSet::new();
        for (idx, source) in sources.iter().cloned().enumerate() {
            let adapter = Arc::clone(&self.adapter);
            let sem = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (idx, Vec::new());
                };
                match tokio::time::timeout(fetch_timeout, adapter.fetch(&source)).await {
                    Ok(items) => (idx, items),
                    Err(_) => {
                        warn!(source = %source.name, "fetch timed out after {:?}", fetch_timeout);
                        (idx, Vec::new())
                    }
                }
            });
        }

        let mut collected: Vec<Vec<RawItem>> = vec![Vec::new(); sources.len()];
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, items)))) => {
                    collected[idx] = items;
                    pb.inc(1);
                }
                Ok(Some(Err(e))) => {
                    warn!("fetch task failed: {}", e);
                    pb.inc(1);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(pending = tasks.len(), "run deadline reached, abandoning slow sources");
                    tasks.abort_all();
                    break;
                }
            }
        }
        pb.finish_and_clear();

        sources.iter().map(|s| s.strictness).zip(collected).collect()
    }

    fn format(&self, selected: &[DealCandidate]) -> Vec<Outgoing> {
        let fmt = self.format_options();
        if selected.is_empty() {
            match self.settings.mode {
                RunMode::Batch => info!("no deals found this round"),
                RunMode::Stream => info!(min_discount = self.settings.min_discount, "no deals above threshold"),
            }
            return vec![Outgoing {
                text: digest::render_no_deals(&fmt),
                keys: Vec::new(),
            }];
        }

        match self.settings.mode {
            RunMode::Batch => {
                info!("Top {} deals selected:", selected.len());
                for (i, deal) in selected.iter().enumerate() {
                    info!("  {}. {}% off — {}", i + 1, deal.discount_percent, deal.title);
                }
                vec![Outgoing {
                    text: digest::render_batch(selected, &fmt),
                    keys: selected.iter().map(|d| self.key(d)).collect(),
                }]
            }
            RunMode::Stream => selected
                .iter()
                .enumerate()
                .map(|(i, deal)| Outgoing {
                    text: digest::render_alert(i + 1, deal, &fmt),
                    keys: vec![self.key(deal)],
                })
                .collect(),
        }
    }

    /// Consecutive messages are spaced by `send_delay`. Keys are remembered only once sent.
    async fn deliver(&self, outbox: Vec<Outgoing>, store: &DedupStore, report: &mut RunReport) {
        for (i, msg) in outbox.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.send_delay()).await;
            }
            if self.send(&msg.text, report).await {
                store.record(msg.keys);
            }
        }
    }

    /// Failures are logged and counted, never retried within the run.
    async fn send(&self, text: &str, report: &mut RunReport) -> bool {
        match self.gateway.send_message(text).await {
            Ok(()) => {
                report.sent += 1;
                true
            }
            Err(e) => {
                error!(run_id = %report.run_id, "delivery failed: {}", e);
                report.failed += 1;
                false
            }
        }
    }

    fn key(&self, deal: &DealCandidate) -> String {
        dedup_key(&deal.title, self.settings.dedup_key_len)
    }

    fn format_options(&self) -> FormatOptions {
        FormatOptions {
            show_source: self.settings.show_source,
            interval: self.settings.interval(),
        }
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} sources")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}
