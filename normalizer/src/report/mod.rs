//! Pipeline event reporting.
//!
//! The pipeline tells a [`PipelineObserver`] what happens during a run. The
//! [`ConsoleObserver`] turns those events into a progress bar and log lines;
//! [`NullObserver`] ignores them.

use indicatif::{ProgressBar, ProgressStyle};

use crate::logs::{log_info, log_success, log_warning};
use crate::parser::Dialect;
use crate::transform::pipeline::{DroppedRecord, Stage};

/// Receives pipeline events. Every method defaults to doing nothing.
pub trait PipelineObserver {
    /// The pipeline entered a new stage.
    fn stage(&mut self, _stage: Stage) {}

    /// The source dialect was detected.
    fn dialect(&mut self, _dialect: &Dialect) {}

    /// The row-count pre-pass finished; `None` when it was interrupted or failed.
    fn estimate(&mut self, _total: Option<u64>) {}

    /// `read` records have been processed so far.
    fn progress(&mut self, _read: u64) {}

    /// A handler asked to skip the record starting on `line`.
    fn skipped(&mut self, _line: u64, _column: &str) {}

    /// A record was dropped because of an error.
    fn dropped(&mut self, _record: &DroppedRecord) {}

    /// Streaming stopped on an interrupt after `read` records.
    fn interrupted(&mut self, _read: u64) {}
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Progress bar plus log lines on stderr.
pub struct ConsoleObserver {
    bar: Option<ProgressBar>,
    show_progress: bool,
    counting: bool,
    /// Individual drops logged before switching to a count only
    log_limit: u64,
    logged: u64,
}

impl ConsoleObserver {
    pub fn new(show_progress: bool) -> Self {
        Self {
            bar: None,
            show_progress,
            counting: true,
            log_limit: 100,
            logged: 0,
        }
    }

    /// Whether the run counts rows before streaming.
    pub fn with_counting(mut self, counting: bool) -> Self {
        self.counting = counting;
        self
    }

    pub fn with_log_limit(mut self, limit: u64) -> Self {
        self.log_limit = limit;
        self
    }

    /// Log without tearing the progress bar.
    fn log(&self, f: impl FnOnce()) {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    fn make_bar(total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} {bar:40.green/black} {pos}/{len} [{elapsed_precise}<{eta_precise}, {per_sec}]")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg} {pos} voters [{elapsed_precise}, {per_sec}]")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message("Processing voters...");
        bar
    }
}

impl PipelineObserver for ConsoleObserver {
    fn stage(&mut self, stage: Stage) {
        match stage {
            Stage::Init => log_info("📖 Reading source..."),
            Stage::Streaming => {
                log_info("🔄 Normalizing records...");
                if self.show_progress {
                    self.bar.get_or_insert_with(|| Self::make_bar(None));
                }
            }
            Stage::Draining => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                log_info("💾 Flushing output...");
            }
            Stage::Done => log_success("Done"),
        }
    }

    fn dialect(&mut self, dialect: &Dialect) {
        log_success(format!("Detected {}", dialect));
        if self.counting {
            log_info("Counting rows... (Press Ctrl-C to continue without a total.)");
        }
    }

    fn estimate(&mut self, total: Option<u64>) {
        match total {
            Some(n) => log_success(format!("{} rows to process", n)),
            None if self.counting => log_warning("Row count unavailable, progress shown without a total"),
            None => {}
        }
        if self.show_progress {
            self.bar = Some(Self::make_bar(total));
        }
    }

    fn progress(&mut self, read: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(read);
        }
    }

    fn dropped(&mut self, record: &DroppedRecord) {
        self.logged += 1;
        if self.logged <= self.log_limit {
            let message = record.to_string();
            self.log(|| log_warning(message));
        } else if self.logged == self.log_limit + 1 {
            self.log(|| log_warning("Further dropped records are only counted, see the run report"));
        }
    }

    fn interrupted(&mut self, read: u64) {
        self.log(|| log_warning(format!("Interrupted after {} records, finishing output", read)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::DropReason;

    #[derive(Default)]
    struct Recorder {
        stages: Vec<Stage>,
        drops: Vec<u64>,
    }

    impl PipelineObserver for Recorder {
        fn stage(&mut self, stage: Stage) {
            self.stages.push(stage);
        }

        fn dropped(&mut self, record: &DroppedRecord) {
            self.drops.push(record.line);
        }
    }

    #[test]
    fn test_default_methods_are_noops() {
        let mut observer = NullObserver;
        observer.stage(Stage::Init);
        observer.estimate(None);
        observer.progress(10);
        observer.skipped(3, "registration_status");
    }

    #[test]
    fn test_recorder_through_trait_object() {
        let mut recorder = Recorder::default();
        {
            let observer: &mut dyn PipelineObserver = &mut recorder;
            observer.stage(Stage::Init);
            observer.dropped(&DroppedRecord {
                line: 4,
                reason: DropReason::Read {
                    message: "bad row".into(),
                },
            });
            observer.stage(Stage::Done);
        }
        assert_eq!(recorder.stages, vec![Stage::Init, Stage::Done]);
        assert_eq!(recorder.drops, vec![4]);
    }

    #[test]
    fn test_console_without_progress_has_no_bar() {
        let mut observer = ConsoleObserver::new(false).with_log_limit(1);
        observer.estimate(Some(10));
        observer.stage(Stage::Streaming);
        assert!(observer.bar.is_none());

        let dropped = DroppedRecord {
            line: 1,
            reason: DropReason::Read {
                message: "bad row".into(),
            },
        };
        observer.dropped(&dropped);
        observer.dropped(&dropped);
        observer.dropped(&dropped);
        assert_eq!(observer.logged, 3);
    }
}
