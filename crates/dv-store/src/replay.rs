//! File replay producer.
//!
//! Reads newline-delimited JSON snapshot records and submits each one
//! through a [`SnapshotSink`], exactly as a live exchange poller would. One
//! background thread replays the configured files in order.
//!
//! ```text
//! {"exchange_name":"binance","pair":"BTCUSDT","observed_at_us":1672515782136000,
//!  "asks":[{"price":30000.1,"amount":0.5}],"bids":[{"price":29999.9,"amount":0.3}]}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use anyhow::{Result, anyhow};
use dv_core::SnapshotRecord;
use tracing::{error, info, warn};

use crate::pipeline::SnapshotSink;

/// Outcome of a replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Records handed to the sink.
    pub submitted: u64,
    /// Lines that did not decode to a valid record.
    pub skipped: u64,
}

impl std::ops::AddAssign for ReplaySummary {
    fn add_assign(&mut self, rhs: Self) {
        self.submitted += rhs.submitted;
        self.skipped += rhs.skipped;
    }
}

/// Replay one file until EOF or until `stop` is raised.
pub fn replay_file(path: &Path, sink: &SnapshotSink, stop: &AtomicBool) -> Result<ReplaySummary> {
    let reader = BufReader::new(File::open(path)?);
    let mut summary = ReplaySummary::default();

    for (idx, line) in reader.lines().enumerate() {
        if stop.load(Ordering::Relaxed) {
            info!("[replay] {} stopped at line {}", path.display(), idx + 1);
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SnapshotRecord>(&line) {
            Ok(record) => {
                sink.submit_record(record)?;
                summary.submitted += 1;
            }
            Err(e) => {
                warn!("[replay] {}:{} skipped: {e}", path.display(), idx + 1);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// A producer that replays snapshot files on a background thread.
pub struct ReplayProducer {
    files: Vec<PathBuf>,
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<ReplaySummary>>,
}

impl ReplayProducer {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files, stop: Arc::new(AtomicBool::new(false)), task: None }
    }

    /// Begin replaying into `sink`.
    pub fn start(&mut self, sink: SnapshotSink) -> Result<()> {
        if self.task.is_some() {
            return Err(anyhow!("replay already started"));
        }
        let files = self.files.clone();
        let stop = self.stop.clone();

        self.task = Some(std::thread::Builder::new().name("replay".into()).spawn(move || {
            let mut total = ReplaySummary::default();
            for path in &files {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                match replay_file(path, &sink, &stop) {
                    Ok(s) => {
                        info!("[replay] {} done, submitted={} skipped={}", path.display(), s.submitted, s.skipped);
                        total += s;
                    }
                    Err(e) => error!("[replay] {} aborted: {e}", path.display()),
                }
            }
            total
        })?);

        info!("[replay] started ({} file(s))", self.files.len());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop submitting and wait for the replay thread to exit.
    ///
    /// Returns once no further submissions can occur, which is what the
    /// pipeline's shutdown requires before closing the queue.
    pub fn stop(&mut self) -> Result<ReplaySummary> {
        self.stop.store(true, Ordering::Relaxed);
        match self.task.take() {
            Some(task) => task.join().map_err(|_| anyhow!("replay thread panicked")),
            None => Ok(ReplaySummary::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use dv_core::config::StoreConfig;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::pipeline::{Pipeline, PipelineContext};

    fn ctx() -> PipelineContext {
        PipelineContext { name: "replay-test".into(), store: StoreConfig::with_address("unused:0") }
    }

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
        f
    }

    const GOOD_A: &str = r#"{"exchange_name":"binance","pair":"BTCUSDT","observed_at_us":1,"asks":[{"price":30000.1,"amount":0.5}],"bids":[]}"#;
    const GOOD_B: &str = r#"{"exchange_name":"okx","pair":"BTC-USDT","observed_at_us":2}"#;

    #[test]
    fn replays_valid_lines_and_skips_the_rest() {
        let file = write_lines(&[GOOD_A, "", "not json", r#"{"exchange_name":"","pair":"X","observed_at_us":3}"#, GOOD_B]);
        let store = MemoryStore::new();
        let pipeline = Pipeline::start(&ctx(), Box::new(store.clone())).unwrap();

        let summary = replay_file(file.path(), &pipeline.sink(), &AtomicBool::new(false)).unwrap();
        pipeline.shutdown().unwrap();

        assert_eq!(summary, ReplaySummary { submitted: 2, skipped: 2 });
        let pairs: Vec<String> = store
            .documents("OrderBooks.orderbooks")
            .iter()
            .map(|r| r.pair().to_string())
            .collect();
        assert_eq!(pairs, ["BTCUSDT", "BTC-USDT"]);
    }

    #[test]
    fn raised_stop_flag_submits_nothing() {
        let file = write_lines(&[GOOD_A, GOOD_B]);
        let pipeline = Pipeline::start(&ctx(), Box::new(MemoryStore::new())).unwrap();
        let summary = replay_file(file.path(), &pipeline.sink(), &AtomicBool::new(true)).unwrap();
        pipeline.shutdown().unwrap();
        assert_eq!(summary.submitted, 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let pipeline = Pipeline::start(&ctx(), Box::new(MemoryStore::new())).unwrap();
        assert!(replay_file(Path::new("/nonexistent/books.jsonl"), &pipeline.sink(), &AtomicBool::new(false)).is_err());
        pipeline.shutdown().unwrap();
    }

    #[test]
    fn producer_replays_all_files_then_stops() {
        let a = write_lines(&[GOOD_A]);
        let b = write_lines(&[GOOD_B, GOOD_A]);
        let store = MemoryStore::new();
        let pipeline = Pipeline::start(&ctx(), Box::new(store.clone())).unwrap();

        let mut producer = ReplayProducer::new(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        producer.start(pipeline.sink()).unwrap();
        assert!(producer.start(pipeline.sink()).is_err());
        while !producer.is_finished() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let summary = producer.stop().unwrap();
        let report = pipeline.shutdown().unwrap();

        assert_eq!(summary.submitted, 3);
        assert_eq!(report.stats.persisted, 3);
        assert_eq!(store.total(), 3);
    }
}
