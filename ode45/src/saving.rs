use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use csv::{Writer, WriterBuilder};

use crate::{error::OdeError, solvers::OutputRecord};

pub type CsvWriter = Writer<BufWriter<File>>;

/// Destination for accepted steps.
///
/// - `Memory`: Accumulates records in RAM.
/// - `File`: Writes each record as a CSV row.
/// - `Trace`: Writes one human readable line per record.
/// - `None`: Performs no saving.
pub enum ResultStorage {
    /// In-memory storage of the trajectory.
    Memory(MemoryResult),
    /// CSV writer to stream output incrementally.
    File(CsvWriter),
    /// Line oriented trace, e.g. to stdout.
    Trace(Box<dyn Write>),
    /// No output storage.
    None,
}

impl ResultStorage {
    /// Creates the CSV file at `path` and writes the header row.
    pub fn file(path: impl AsRef<Path>) -> Result<Self, OdeError> {
        let buf_writer = BufWriter::new(File::create(path)?);
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(buf_writer);
        writer.write_record(["t", "y", "error", "h"])?;
        Ok(Self::File(writer))
    }

    pub fn trace(writer: impl Write + 'static) -> Self {
        Self::Trace(Box::new(writer))
    }

    /// Save an accepted step to the result store.
    ///
    /// No-op if storage is `None`.
    pub fn save(&mut self, record: &OutputRecord) -> Result<(), OdeError> {
        match self {
            ResultStorage::Memory(result) => result.insert(record),
            ResultStorage::File(writer) => writer.serialize(record)?,
            ResultStorage::Trace(writer) => writeln!(writer, "{record}")?,
            ResultStorage::None => {}
        }
        Ok(())
    }

    /// Finalize and flush result storage.
    ///
    /// For `Memory`, this releases unused buffer capacity.
    /// For `File` and `Trace`, this flushes the writer.
    pub fn truncate(&mut self) -> Result<(), OdeError> {
        match self {
            ResultStorage::Memory(result) => result.truncate(),
            ResultStorage::File(writer) => writer.flush()?,
            ResultStorage::Trace(writer) => writer.flush()?,
            ResultStorage::None => {}
        }
        Ok(())
    }
}

/// In-memory trajectory, one entry per accepted step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryResult {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
    pub error: Vec<f64>,
    pub h: Vec<f64>,
}

impl MemoryResult {
    /// Constructs an empty result with room for `n` steps.
    pub fn new(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            error: Vec::with_capacity(n),
            h: Vec::with_capacity(n),
        }
    }

    fn insert(&mut self, record: &OutputRecord) {
        self.t.push(record.t);
        self.y.push(record.y);
        self.error.push(record.error);
        self.h.push(record.h);
    }

    /// Number of saved steps.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = OutputRecord> + '_ {
        (0..self.len()).map(|i| OutputRecord {
            t: self.t[i],
            y: self.y[i],
            error: self.error[i],
            h: self.h[i],
        })
    }

    fn truncate(&mut self) {
        self.t.shrink_to_fit();
        self.y.shrink_to_fit();
        self.error.shrink_to_fit();
        self.h.shrink_to_fit();
    }
}
