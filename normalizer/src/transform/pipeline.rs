//! Streaming normalization pipeline.
//!
//! Reads the source one record at a time, runs every field through the
//! [`HandlerRegistry`], and writes survivors to the sink in the "excel"
//! dialect. A bad record never stops the run: skips, field faults, read
//! faults and write faults are counted and reported, and streaming goes on.
//!
//! ```text
//! Init ──▶ Streaming ──▶ Draining ──▶ Done
//!  │ sniff dialect, count rows (optional), write header
//!  │           │ read ─▶ transform ─▶ write | skip | report
//!  │           │                            │ flush sink
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use matzbiim::{layout, NullObserver, StreamPipeline};
//! use std::path::Path;
//!
//! let layout = layout::builtin("nys")?;
//! let summary = StreamPipeline::for_layout(&layout)
//!     .run_files(Path::new("data/AllNYSVoters.txt"), Path::new("data/output.csv"), &mut NullObserver)?;
//! println!("{}", summary.summary());
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::count::{count_rows, Interrupt};
use super::record::{FieldFault, Record, RecordOutcome, RecordTransformer};
use super::registry::HandlerRegistry;
use crate::error::{PipelineError, PipelineResult};
use crate::layout::Layout;
use crate::parser::{detect_dialect, excel_writer, read_sample, Dialect, FieldDecoder, DEFAULT_SAMPLE_SIZE};
use crate::report::PipelineObserver;

/// Options for a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOptions {
    /// Bytes inspected for dialect detection
    pub sample_size: usize,

    /// Count rows first to size the progress bar
    pub count_rows: bool,

    /// First source row is a header and is not normalized
    pub has_header: bool,

    /// Dropped records kept in the summary; later ones are only counted
    pub max_fault_details: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            count_rows: true,
            has_header: false,
            max_fault_details: 1000,
        }
    }
}

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Streaming,
    Draining,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Streaming => "streaming",
            Stage::Draining => "draining",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a record did not make it to the output
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    /// A handler failed on one field
    Field(FieldFault),
    /// The row could not be read as a record of the layout
    Read { message: String },
    /// The sink rejected the transformed record
    Write { message: String, record: Record },
}

/// A record dropped with an error, for operator follow-up
#[derive(Debug, Clone, Serialize)]
pub struct DroppedRecord {
    /// Source line the record starts on
    pub line: u64,
    #[serde(flatten)]
    pub reason: DropReason,
}

impl fmt::Display for DroppedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DropReason::Field(fault) => write!(
                f,
                "Line {}, column '{}' (value '{}'): {}",
                self.line, fault.column, fault.value, fault.message
            ),
            DropReason::Read { message } => write!(f, "Line {}: unreadable row: {}", self.line, message),
            DropReason::Write { message, record } => {
                let contents = serde_json::to_string(record).unwrap_or_default();
                write!(f, "Line {}: writing row failed: {}\n{}", self.line, message, contents)
            }
        }
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub source: Option<String>,
    pub output: Option<String>,
    pub delimiter: String,
    pub encoding: String,
    /// Row estimate from the pre-pass, if it completed
    pub estimated_total: Option<u64>,
    /// Data records read (header excluded)
    pub read: u64,
    pub written: u64,
    pub skipped: u64,
    pub field_faults: u64,
    pub read_faults: u64,
    pub write_faults: u64,
    /// Streaming stopped early on an interrupt
    pub interrupted: bool,
    pub elapsed_ms: u64,
    /// First dropped records, up to `max_fault_details`
    pub dropped: Vec<DroppedRecord>,
    /// More records were dropped than are listed
    pub dropped_truncated: bool,
}

impl RunSummary {
    /// Records dropped because of an error (skips not included)
    pub fn dropped_count(&self) -> u64 {
        self.field_faults + self.read_faults + self.write_faults
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Read: {} records, {} written, {} skipped, {} dropped ({} field, {} read, {} write)",
            self.read,
            self.written,
            self.skipped,
            self.dropped_count(),
            self.field_faults,
            self.read_faults,
            self.write_faults
        )
    }

    fn record_drop(&mut self, dropped: DroppedRecord, limit: usize) {
        match dropped.reason {
            DropReason::Field(_) => self.field_faults += 1,
            DropReason::Read { .. } => self.read_faults += 1,
            DropReason::Write { .. } => self.write_faults += 1,
        }
        if self.dropped.len() < limit {
            self.dropped.push(dropped);
        } else {
            self.dropped_truncated = true;
        }
    }
}

/// Streams records from a source through a registry into a sink.
pub struct StreamPipeline<'r> {
    registry: &'r HandlerRegistry,
    columns: Arc<[String]>,
    options: PipelineOptions,
    interrupt: Interrupt,
}

impl<'r> StreamPipeline<'r> {
    /// Pipeline over an ordered column list.
    pub fn new(registry: &'r HandlerRegistry, columns: Vec<String>) -> Self {
        Self {
            registry,
            columns: columns.into(),
            options: PipelineOptions::default(),
            interrupt: Interrupt::new(),
        }
    }

    /// Pipeline for a layout, honoring its header setting.
    pub fn for_layout(layout: &'r Layout) -> Self {
        let mut pipeline = Self::new(&layout.registry, layout.columns.clone());
        pipeline.options.has_header = layout.has_header;
        pipeline
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Normalize `source` into `sink`, both files.
    pub fn run_files(
        &self,
        source: &Path,
        sink: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> PipelineResult<RunSummary> {
        let source_file = File::open(source).map_err(|e| PipelineError::Source {
            path: source.to_path_buf(),
            source: e,
        })?;
        let sink_file = File::create(sink).map_err(|e| PipelineError::Sink {
            path: sink.to_path_buf(),
            source: e,
        })?;

        let mut summary = self.run(source_file, BufWriter::new(sink_file), observer)?;
        summary.source = Some(source.display().to_string());
        summary.output = Some(sink.display().to_string());
        Ok(summary)
    }

    /// Normalize any seekable source into any sink.
    ///
    /// The source is rewound to its start after sniffing and after the row
    /// count, so both pre-steps are invisible to the streaming pass.
    pub fn run<R, W>(
        &self,
        mut source: R,
        sink: W,
        observer: &mut dyn PipelineObserver,
    ) -> PipelineResult<RunSummary>
    where
        R: Read + Seek,
        W: Write,
    {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        observer.stage(Stage::Init);
        let sample = read_sample(&mut source, self.options.sample_size)?;
        let dialect = detect_dialect(&sample)?;
        source.seek(SeekFrom::Start(0))?;
        summary.delimiter = dialect.delimiter_display();
        summary.encoding = dialect.encoding.clone();
        observer.dialect(&dialect);

        if self.options.count_rows {
            let lines = count_rows(&mut source, &self.interrupt);
            // A Ctrl-C landing after the last block was meant for the count
            self.interrupt.take();
            source.seek(SeekFrom::Start(0))?;
            summary.estimated_total = lines.map(|n| {
                if self.options.has_header {
                    n.saturating_sub(1)
                } else {
                    n
                }
            });
        }
        observer.estimate(summary.estimated_total);

        let mut writer = RecordWriter::new(sink);
        writer
            .write_row(self.columns.iter())
            .map_err(|fault| fault.into_error(1))?;

        observer.stage(Stage::Streaming);
        self.stream(&mut source, &dialect, &mut writer, &mut summary, observer)?;

        observer.stage(Stage::Draining);
        writer.flush()?;

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        observer.stage(Stage::Done);
        Ok(summary)
    }

    fn stream<R: Read, W: Write>(
        &self,
        source: R,
        dialect: &Dialect,
        writer: &mut RecordWriter<W>,
        summary: &mut RunSummary,
        observer: &mut dyn PipelineObserver,
    ) -> PipelineResult<()> {
        let mut reader = dialect.reader_builder().from_reader(source);
        let decoder = dialect.decoder();
        let transformer = RecordTransformer::new(self.registry);
        let limit = self.options.max_fault_details;
        let mut row = csv::ByteRecord::new();
        let mut header_pending = self.options.has_header;

        loop {
            if self.interrupt.take() {
                summary.interrupted = true;
                observer.interrupted(summary.read);
                break;
            }

            match reader.read_byte_record(&mut row) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    summary.read += 1;
                    let dropped = DroppedRecord {
                        line: e.position().map(|p| p.line()).unwrap_or(0),
                        reason: DropReason::Read { message: e.to_string() },
                    };
                    observer.dropped(&dropped);
                    summary.record_drop(dropped, limit);
                    continue;
                }
            }

            if header_pending {
                header_pending = false;
                continue;
            }

            summary.read += 1;
            let line = row.position().map(|p| p.line()).unwrap_or(summary.read);

            let dropped = match self.decode(&row, &decoder) {
                Err(message) => Some(DropReason::Read { message }),
                Ok(record) => match transformer.apply(record) {
                    RecordOutcome::Transformed(record) => {
                        let written = writer.write_row(record.values());
                        match written {
                            Ok(()) => {
                                summary.written += 1;
                                None
                            }
                            Err(WriteFault::Rejected(e)) => Some(DropReason::Write {
                                message: e.to_string(),
                                record,
                            }),
                            Err(fault @ WriteFault::Partial(_)) => return Err(fault.into_error(line)),
                        }
                    }
                    RecordOutcome::Skipped { column } => {
                        summary.skipped += 1;
                        observer.skipped(line, &column);
                        None
                    }
                    RecordOutcome::Fault(fault) => Some(DropReason::Field(fault)),
                },
            };

            if let Some(reason) = dropped {
                let dropped = DroppedRecord { line, reason };
                observer.dropped(&dropped);
                summary.record_drop(dropped, limit);
            }

            observer.progress(summary.read);
        }

        Ok(())
    }

    /// Map a raw row onto the layout's columns.
    fn decode(&self, row: &csv::ByteRecord, decoder: &FieldDecoder) -> Result<Record, String> {
        if row.len() > self.columns.len() {
            return Err(format!(
                "expected at most {} fields, found {}",
                self.columns.len(),
                row.len()
            ));
        }
        let values = row.iter().map(|field| decoder.decode(field)).collect();
        Ok(Record::new(Arc::clone(&self.columns), values))
    }
}

/// Why a row did not reach the sink.
#[derive(Debug)]
enum WriteFault {
    /// Nothing of the row reached the sink; the output is still well formed.
    Rejected(csv::Error),
    /// Part of the row reached the sink before it failed.
    Partial(std::io::Error),
}

impl WriteFault {
    /// The fault as a run-ending error for the row on `line`.
    fn into_error(self, line: u64) -> PipelineError {
        match self {
            WriteFault::Rejected(e) => PipelineError::Csv(e),
            WriteFault::Partial(source) => PipelineError::PartialWrite { line, source },
        }
    }
}

/// Encodes one row at a time so a failed write is attributable to the row
/// being written.
struct RecordWriter<W: Write> {
    sink: W,
    buf: Vec<u8>,
}

impl<W: Write> RecordWriter<W> {
    fn new(sink: W) -> Self {
        Self { sink, buf: Vec::new() }
    }

    fn write_row<I, T>(&mut self, fields: I) -> Result<(), WriteFault>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.buf.clear();
        {
            let mut encoder = excel_writer(&mut self.buf);
            encoder.write_record(fields).map_err(WriteFault::Rejected)?;
            encoder
                .flush()
                .map_err(|e| WriteFault::Rejected(csv::Error::from(e)))?;
        }
        self.commit()
    }

    /// Hand the encoded row to the sink, tracking how much of it got through.
    fn commit(&mut self) -> Result<(), WriteFault> {
        let mut written = 0;
        while written < self.buf.len() {
            let failure = match self.sink.write(&self.buf[written..]) {
                Ok(0) => std::io::Error::new(ErrorKind::WriteZero, "sink accepted no bytes"),
                Ok(n) => {
                    written += n;
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => e,
            };
            return Err(if written == 0 {
                WriteFault::Rejected(csv::Error::from(failure))
            } else {
                WriteFault::Partial(failure)
            });
        }
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, HandlerResult};
    use crate::report::NullObserver;
    use std::io::{self, Cursor};

    fn date(value: &str) -> HandlerResult {
        if value.is_empty() {
            return Ok(String::new());
        }
        let parsed = chrono::NaiveDate::parse_from_str(value, "%Y%m%d")?;
        Ok(parsed.format("%Y-%m-%d").to_string())
    }

    fn status(value: &str) -> HandlerResult {
        if value == "P" {
            Err(HandlerError::Skip)
        } else {
            Ok(value.to_string())
        }
    }

    fn columns() -> Vec<String> {
        ["name", "dob", "status"].iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register_for("name", |v: &str| Ok(v.to_uppercase()))
            .register_for("dob", date)
            .register_for("status", status);
        registry
    }

    fn run(registry: &HandlerRegistry, input: &str, options: PipelineOptions) -> (String, RunSummary) {
        let mut out = Vec::new();
        let summary = StreamPipeline::new(registry, columns())
            .with_options(options)
            .run(Cursor::new(input.as_bytes().to_vec()), &mut out, &mut NullObserver)
            .unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    /// Fails every write whose bytes contain `needle`.
    struct PickySink {
        inner: Vec<u8>,
        needle: &'static str,
    }

    impl Write for PickySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if String::from_utf8_lossy(buf).contains(self.needle) {
                return Err(io::Error::new(io::ErrorKind::Other, "sink rejected row"));
            }
            self.inner.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Accepts the first few bytes of a row containing `needle`, then fails
    /// every later write.
    struct TearingSink {
        inner: Vec<u8>,
        needle: &'static str,
        broken: bool,
    }

    impl Write for TearingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let n = if String::from_utf8_lossy(buf).contains(self.needle) {
                self.broken = true;
                buf.len().min(4)
            } else {
                buf.len()
            };
            self.inner.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Raises the interrupt the `at`-th time the source reaches its end.
    struct InterruptAtEof {
        inner: Cursor<Vec<u8>>,
        interrupt: Interrupt,
        eofs: usize,
        at: usize,
    }

    impl Read for InterruptAtEof {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n == 0 && !buf.is_empty() {
                self.eofs += 1;
                if self.eofs == self.at {
                    self.interrupt.raise();
                }
            }
            Ok(n)
        }
    }

    impl Seek for InterruptAtEof {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.sample_size, 1024);
        assert!(opts.count_rows);
        assert!(!opts.has_header);
    }

    #[test]
    fn test_end_to_end() {
        let input = "jane;19800101;A\njohn;19790202;P\nmary;;A\n";
        let (out, summary) = run(&registry(), input, PipelineOptions::default());

        assert_eq!(out, "name,dob,status\r\nJANE,1980-01-01,A\r\nMARY,,A\r\n");
        assert_eq!(summary.read, 3);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dropped_count(), 0);
        assert_eq!(summary.estimated_total, Some(3));
        assert_eq!(summary.delimiter, ";");
    }

    #[test]
    fn test_fault_isolated_and_order_preserved() {
        let input = "a;19800101;A\nb;2020-99-99;A\nc;19900303;A\nd;19910404;A\n";
        let (out, summary) = run(&registry(), input, PipelineOptions::default());

        assert_eq!(out, "name,dob,status\r\nA,1980-01-01,A\r\nC,1990-03-03,A\r\nD,1991-04-04,A\r\n");
        assert_eq!(summary.field_faults, 1);
        let dropped = &summary.dropped[0];
        assert_eq!(dropped.line, 2);
        match &dropped.reason {
            DropReason::Field(fault) => {
                assert_eq!(fault.column, "dob");
                assert_eq!(fault.value, "2020-99-99");
            }
            other => panic!("unexpected drop: {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_padded_long_rows_dropped() {
        let input = "a,19800101\nb,19800101,A,extra\nc,19800101,A\n";
        let (out, summary) = run(&registry(), input, PipelineOptions::default());

        assert_eq!(out, "name,dob,status\r\nA,1980-01-01,\r\nC,1980-01-01,A\r\n");
        assert_eq!(summary.read_faults, 1);
        assert!(matches!(summary.dropped[0].reason, DropReason::Read { .. }));
        assert_eq!(summary.dropped[0].line, 2);
    }

    #[test]
    fn test_write_fault_does_not_stop_run() {
        let registry = registry();
        let mut sink = PickySink {
            inner: Vec::new(),
            needle: "BAD",
        };
        let summary = StreamPipeline::new(&registry, columns())
            .run(Cursor::new(b"ok1,,A\nbad,,A\nok2,,A\n".to_vec()), &mut sink, &mut NullObserver)
            .unwrap();

        assert_eq!(String::from_utf8(sink.inner).unwrap(), "name,dob,status\r\nOK1,,A\r\nOK2,,A\r\n");
        assert_eq!(summary.written, 2);
        assert_eq!(summary.write_faults, 1);
        match &summary.dropped[0].reason {
            DropReason::Write { record, .. } => assert_eq!(record.get("name"), Some("BAD")),
            other => panic!("unexpected drop: {:?}", other),
        }
    }

    #[test]
    fn test_header_row_skipped() {
        let input = "name,dob,status\njane,19800101,A\n";
        let options = PipelineOptions {
            has_header: true,
            ..Default::default()
        };
        let (out, summary) = run(&registry(), input, options);

        assert_eq!(out, "name,dob,status\r\nJANE,1980-01-01,A\r\n");
        assert_eq!(summary.read, 1);
        assert_eq!(summary.estimated_total, Some(1));
    }

    #[test]
    fn test_interrupted_count_still_streams_everything() {
        let registry = registry();
        let interrupt = Interrupt::new();
        interrupt.raise();

        let mut out = Vec::new();
        let summary = StreamPipeline::new(&registry, columns())
            .with_interrupt(interrupt)
            .run(Cursor::new(b"a,,A\nb,,A\n".to_vec()), &mut out, &mut NullObserver)
            .unwrap();

        assert_eq!(summary.estimated_total, None);
        assert!(!summary.interrupted);
        assert_eq!(summary.written, 2);
    }

    #[test]
    fn test_partial_write_is_fatal() {
        let registry = registry();
        let mut sink = TearingSink {
            inner: Vec::new(),
            needle: "BAD",
            broken: false,
        };
        let result = StreamPipeline::new(&registry, columns()).run(
            Cursor::new(b"ok1,,A\nbadrow,,A\nok2,,A\n".to_vec()),
            &mut sink,
            &mut NullObserver,
        );

        assert!(matches!(result, Err(PipelineError::PartialWrite { line: 2, .. })));
        assert_eq!(String::from_utf8(sink.inner).unwrap(), "name,dob,status\r\nOK1,,A\r\nBADR");
    }

    #[test]
    fn test_interrupt_at_end_of_count_keeps_streaming() {
        let registry = registry();
        let interrupt = Interrupt::new();
        // First end of input is the dialect sample, second is the count
        let source = InterruptAtEof {
            inner: Cursor::new(b"a,,A\nb,,A\n".to_vec()),
            interrupt: interrupt.clone(),
            eofs: 0,
            at: 2,
        };

        let mut out = Vec::new();
        let summary = StreamPipeline::new(&registry, columns())
            .with_interrupt(interrupt)
            .run(source, &mut out, &mut NullObserver)
            .unwrap();

        assert_eq!(summary.estimated_total, Some(2));
        assert!(!summary.interrupted);
        assert_eq!(summary.written, 2);
    }

    #[test]
    fn test_latin1_after_ascii_sample() {
        let mut input = "jane,19800101,A\n".repeat(100).into_bytes();
        input.extend_from_slice(b"Ren\xE9,,A\n");

        let registry = registry();
        let mut out = Vec::new();
        let summary = StreamPipeline::new(&registry, columns())
            .run(Cursor::new(input), &mut out, &mut NullObserver)
            .unwrap();

        assert_eq!(summary.encoding, "utf-8");
        assert_eq!(summary.written, 101);
        assert_eq!(summary.dropped_count(), 0);
        assert!(String::from_utf8(out).unwrap().ends_with("\r\nRENÉ,,A\r\n"));
    }

    #[test]
    fn test_interrupt_during_streaming_drains() {
        let registry = registry();
        let interrupt = Interrupt::new();
        interrupt.raise();
        let options = PipelineOptions {
            count_rows: false,
            ..Default::default()
        };

        let mut out = Vec::new();
        let summary = StreamPipeline::new(&registry, columns())
            .with_options(options)
            .with_interrupt(interrupt)
            .run(Cursor::new(b"a,,A\nb,,A\n".to_vec()), &mut out, &mut NullObserver)
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.written, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "name,dob,status\r\n");
    }

    #[test]
    fn test_fault_details_capped() {
        let input = "a,x,A\nb,y,A\nc,z,A\n";
        let options = PipelineOptions {
            max_fault_details: 2,
            ..Default::default()
        };
        let (_, summary) = run(&registry(), input, options);

        assert_eq!(summary.field_faults, 3);
        assert_eq!(summary.dropped.len(), 2);
        assert!(summary.dropped_truncated);
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let registry = registry();
        let result = StreamPipeline::new(&registry, columns()).run(Cursor::new(Vec::new()), Vec::new(), &mut NullObserver);
        assert!(matches!(result, Err(PipelineError::Dialect(_))));
    }

    #[test]
    fn test_quoted_fields_round_trip() {
        let input = "\"o'brien, jr\";\"19800101\";\"A\"\n";
        let (out, _) = run(&registry(), input, PipelineOptions::default());
        assert_eq!(out, "name,dob,status\r\n\"O'BRIEN, JR\",1980-01-01,A\r\n");
    }

    #[test]
    fn test_dropped_record_json() {
        let dropped = DroppedRecord {
            line: 7,
            reason: DropReason::Field(FieldFault {
                column: "dob".into(),
                value: "2020-99-99".into(),
                message: "invalid date".into(),
            }),
        };
        let json = serde_json::to_value(&dropped).unwrap();
        assert_eq!(json["line"], 7);
        assert_eq!(json["kind"], "field");
        assert_eq!(json["column"], "dob");
        assert!(dropped.to_string().contains("column 'dob' (value '2020-99-99')"));
    }
}
