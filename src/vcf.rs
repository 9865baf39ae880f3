use crate::{
    database::{normalize_chrom, Locus},
    error::Error,
    Result,
};
use log::debug;
use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// Number of mandatory columns for a single sample VCF (8 fixed, FORMAT and one sample)
pub const MIN_COLUMNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Fields of a VCF data line needed for the lookup
pub struct Record {
    /// 1-based line number in the input
    pub line: usize,
    /// Chromosome as written
    pub chrom: String,
    /// 1-based position
    pub pos: u64,
    /// Entries of the ID column, empty for `.`
    pub ids: Vec<String>,
    /// REF column
    pub reference: String,
    /// Entries of the ALT column, empty for `.`
    pub alternates: Vec<String>,
    /// Raw `GT` value of the first sample
    pub genotype: String,
}

impl Record {
    /// Normalized chromosome and position
    pub fn locus(&self) -> Locus {
        Locus {
            chrom: self.normalized_chrom(),
            pos: self.pos,
        }
    }

    /// IDs as string slices
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Chromosome with any `chr` prefix removed
    pub fn normalized_chrom(&self) -> String {
        normalize_chrom(&self.chrom)
    }
}

/// Streaming reader over the data lines of a VCF
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> Reader<R> {
    /// Wraps a buffered reader positioned at the start of the file
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }
}

/// Opens a plain or compressed VCF, the compression format is sniffed from the content
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<BufReader<Box<dyn Read>>>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let (rdr, format) = niffler::from_path(path)?;
    let rdr: Box<dyn Read> = rdr;
    debug!("Opened {} as {:?}", path.display(), format);
    Ok(Reader::new(BufReader::new(rdr)))
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
                    if line.trim().is_empty() || line.starts_with('#') {
                        continue;
                    }
                    return Some(parse_record(self.line, line));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

fn parse_record(line_no: usize, line: &str) -> Result<Record> {
    let malformed = |reason: String| Error::MalformedRecord {
        line: line_no,
        reason,
    };

    let fields = line.split('\t').collect::<Vec<_>>();
    if fields.len() < MIN_COLUMNS {
        return Err(malformed(format!(
            "expected at least {} tab-separated columns, found {}",
            MIN_COLUMNS,
            fields.len()
        )));
    }

    let pos = fields[1]
        .parse::<u64>()
        .map_err(|_| malformed(format!("invalid position `{}`", fields[1])))?;

    Ok(Record {
        line: line_no,
        chrom: fields[0].to_string(),
        pos,
        ids: split_list(fields[2], ';'),
        reference: fields[3].to_string(),
        alternates: split_list(fields[4], ','),
        genotype: sample_genotype(fields[8], fields[9]).to_string(),
    })
}

fn split_list(field: &str, sep: char) -> Vec<String> {
    if field == "." || field.is_empty() {
        Vec::new()
    } else {
        field.split(sep).map(str::to_string).collect()
    }
}

/// `GT` value of a sample column using the FORMAT keys, defaulting to the first sub-field
fn sample_genotype<'a>(format: &str, sample: &'a str) -> &'a str {
    let idx = format.split(':').position(|key| key == "GT").unwrap_or(0);
    sample.split(':').nth(idx).unwrap_or(".")
}
