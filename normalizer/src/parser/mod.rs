//! Dialect sniffing and CSV reader/writer construction.
//!
//! The source dialect (delimiter, quote character, text encoding) is detected
//! once from a leading sample. Output always uses the "excel" dialect.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::Encoding;

use crate::error::{DialectError, DialectResult, PipelineError, PipelineResult};

/// Number of leading bytes inspected when sniffing.
pub const DEFAULT_SAMPLE_SIZE: usize = 1024;

/// Delimiters tried, in tie-breaking order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

const CANDIDATE_QUOTES: [u8; 2] = [b'"', b'\''];

/// Detected layout of a delimited text source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    /// Whether quoted fields were seen in the sample
    pub quoted: bool,
    /// Normalized encoding label
    pub encoding: String,
}

impl Dialect {
    /// The "excel" dialect used for all output.
    pub fn excel() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quoted: true,
            encoding: "utf-8".to_string(),
        }
    }

    /// Reader for this dialect. Headers are never consumed by the reader itself
    /// and ragged rows are accepted so the pipeline can report them per record.
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .double_quote(true)
            .has_headers(false)
            .flexible(true);
        builder
    }

    pub fn decoder(&self) -> FieldDecoder {
        FieldDecoder::for_label(&self.encoding)
    }

    /// Printable delimiter (`\t` for tabs).
    pub fn delimiter_display(&self) -> String {
        format_delimiter(self.delimiter)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delimiter '{}', quote '{}'{}, encoding {}",
            self.delimiter_display(),
            self.quote as char,
            if self.quoted { "" } else { " (unused)" },
            self.encoding
        )
    }
}

/// Format delimiter for display
pub fn format_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        d => (d as char).to_string(),
    }
}

/// Build the "excel" writer: comma, double quotes, minimal quoting, CRLF.
pub fn excel_writer<W: io::Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .double_quote(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

// =============================================================================
// Encoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
///
/// Valid UTF-8 (allowing a character cut off at the end of the sample) is
/// reported as `utf-8` without consulting chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(_) => return "utf-8".to_string(),
        Err(e) if e.error_len().is_none() => return "utf-8".to_string(),
        Err(_) => {}
    }

    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "" => "utf-8".to_string(),
        other => other.to_string(),
    }
}

/// Decodes raw field bytes with the detected encoding.
///
/// The encoding is sniffed from the head of the file only, so a UTF-8 guess
/// can meet Latin-1 bytes further down. Such fields are decoded as
/// windows-1252, which maps every byte to a character.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecoder {
    /// `None` decodes as UTF-8
    encoding: Option<&'static Encoding>,
}

impl FieldDecoder {
    pub fn utf8() -> Self {
        Self { encoding: None }
    }

    /// Decoder for a WHATWG encoding label; unknown labels fall back to UTF-8.
    pub fn for_label(label: &str) -> Self {
        match Encoding::for_label(label.as_bytes()) {
            Some(enc) if enc != encoding_rs::UTF_8 => Self { encoding: Some(enc) },
            _ => Self::utf8(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding {
            None => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_string(),
                Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
            },
            Some(enc) => enc.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}

// =============================================================================
// Sniffing
// =============================================================================

/// Read up to `size` leading bytes from a reader.
pub fn read_sample<R: Read>(reader: &mut R, size: usize) -> io::Result<Vec<u8>> {
    let mut sample = Vec::with_capacity(size);
    reader.take(size as u64).read_to_end(&mut sample)?;
    Ok(sample)
}

/// Detect the dialect of a file from its first `sample_size` bytes.
pub fn sniff_file<P: AsRef<Path>>(path: P, sample_size: usize) -> PipelineResult<Dialect> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| PipelineError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    let sample = read_sample(&mut file, sample_size)?;
    Ok(detect_dialect(&sample)?)
}

/// Detect delimiter, quote character and encoding from a leading sample.
pub fn detect_dialect(sample: &[u8]) -> DialectResult<Dialect> {
    if sample.is_empty() {
        return Err(DialectError::EmptySample);
    }

    let encoding = detect_encoding(sample);
    let text = FieldDecoder::for_label(&encoding).decode(sample);
    let lines = sample_lines(&text);
    let first = lines.first().ok_or(DialectError::EmptySample)?;

    let detected_quote = detect_quote(&lines);
    let quote = detected_quote.unwrap_or(b'"');

    let delimiter = detect_delimiter(&lines, quote)
        .ok_or_else(|| DialectError::UndetectableDelimiter(first.chars().take(40).collect()))?;

    Ok(Dialect {
        delimiter,
        quote,
        quoted: detected_quote.is_some(),
        encoding,
    })
}

/// Non-blank lines of the sample. The last line is dropped when the sample
/// was cut mid-line, unless it is the only one.
fn sample_lines(sample: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Quote character that opens fields most often, if any.
fn detect_quote(lines: &[&str]) -> Option<u8> {
    CANDIDATE_QUOTES
        .iter()
        .map(|&q| {
            let hits: usize = lines.iter().map(|line| count_quoted_fields(line, q)).sum();
            (q, hits)
        })
        .filter(|&(_, hits)| hits > 0)
        .fold(None, |best: Option<(u8, usize)>, current| match best {
            Some(b) if b.1 >= current.1 => Some(b),
            _ => Some(current),
        })
        .map(|(q, _)| q)
}

fn count_quoted_fields(line: &str, quote: u8) -> usize {
    let bytes = line.as_bytes();
    let mut hits = usize::from(bytes.first() == Some(&quote));
    for pair in bytes.windows(2) {
        if pair[1] == quote && CANDIDATE_DELIMITERS.contains(&pair[0]) {
            hits += 1;
        }
    }
    hits
}

/// Pick the delimiter with a consistent per-line count, preferring the
/// highest count. Falls back to the most frequent one on the first line.
fn detect_delimiter(lines: &[&str], quote: u8) -> Option<u8> {
    let mut best: Option<(u8, bool, usize)> = None;

    for &candidate in &CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate, quote))
            .collect();
        let first = counts.first().copied().unwrap_or(0);
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().all(|&c| c == first);

        let better = match best {
            None => true,
            Some((_, best_consistent, best_count)) => {
                (consistent, first) > (best_consistent, best_count)
            }
        };
        if better {
            best = Some((candidate, consistent, first));
        }
    }

    best.map(|(delimiter, _, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8, quote: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == quote {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
