//! # Table Codec
//!
//! Delimited text ⇄ Arrow `RecordBatch`, built on `arrow-csv`.
//!
//! Files whose extension marks the compressed format are piped through an
//! external decompression process on read and an external compression process
//! on write. An optional shell command can post-process the text before it is
//! parsed. Plain files with no post-processing are read directly.

use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow_csv::reader::Format;
use itertools::Itertools;
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Operation, Result};
use crate::runner;

/// Delimited text options.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: `,`)
    pub delimiter: u8,
    /// Whether the first row is a header (default: true)
    pub has_header: bool,
    /// Quote character (default: `"`)
    pub quote: u8,
    /// Rows sampled for type inference (default: 1000)
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            quote: b'"',
            schema_infer_max_records: 1000,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn format(&self) -> Format {
        Format::default()
            .with_delimiter(self.delimiter)
            .with_header(self.has_header)
            .with_quote(self.quote)
    }
}

/// The compressed-file convention: an extension plus the shell words of the
/// tools that undo and apply it. Both tools stream stdin/file to stdout.
#[derive(Debug, Clone)]
pub struct Compression {
    pub extension: String,
    pub decompress: String,
    pub compress: String,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            extension: "gz".to_string(),
            decompress: "gzip -dc".to_string(),
            compress: "gzip -c".to_string(),
        }
    }
}

impl Compression {
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableCodec {
    pub csv: CsvOptions,
    pub compression: Compression,
}

impl TableCodec {
    pub fn new(csv: CsvOptions, compression: Compression) -> Self {
        Self { csv, compression }
    }

    /// Shell script that produces the text to parse, or `None` for a direct read.
    fn decode_script(&self, path: &Path, process: Option<&str>) -> Option<String> {
        let compressed = self.compression.matches(path);
        match (compressed, process) {
            (false, None) => None,
            (true, None) => Some(format!("{} \"$1\"", self.compression.decompress)),
            (true, Some(p)) => Some(format!("{} \"$1\" | {p}", self.compression.decompress)),
            (false, Some(p)) => Some(format!("cat \"$1\" | {p}")),
        }
    }

    /// Decodes the file at `path`, optionally through a post-processing command.
    pub fn decode(&self, path: &Path, process: Option<&str>) -> Result<RecordBatch> {
        let bytes = match self.decode_script(path, process) {
            None => fs::read(path)?,
            Some(script) => {
                debug!("Decoding {} via: {script}", path.display());
                runner::run_pipeline(Operation::Decode, &script, path)?
            }
        };
        self.parse(bytes)
    }

    /// Parses delimited text into a single batch, inferring column types.
    pub fn parse(&self, bytes: Vec<u8>) -> Result<RecordBatch> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
        }
        let (schema, _) = self
            .csv
            .format()
            .infer_schema(Cursor::new(&bytes), Some(self.csv.schema_infer_max_records))?;
        let schema: SchemaRef = Arc::new(schema);
        let reader = arrow_csv::ReaderBuilder::new(schema.clone())
            .with_format(self.csv.format())
            .build(Cursor::new(bytes))?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(concat_batches(&schema, &batches)?)
    }

    /// Writes `batch` to `dest`, compressing when the extension asks for it.
    ///
    /// A failed compression leaves the uncompressed temporary file in place.
    pub fn encode(&self, batch: &RecordBatch, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if !self.compression.matches(dest) {
            return self.write_csv(batch, dest);
        }

        let tmp = uncompressed_sibling(dest);
        self.write_csv(batch, &tmp)?;
        let mut words = shlex::split(&self.compression.compress).unwrap_or_default();
        if words.is_empty() {
            words.push(self.compression.compress.clone());
        }
        let program = PathBuf::from(words.remove(0));
        words.push(tmp.to_string_lossy().into_owned());
        let out = runner::run(&program, &words)?.check(Operation::Compress)?;
        fs::write(dest, out.stdout)?;
        fs::remove_file(&tmp)?;
        Ok(())
    }

    fn write_csv(&self, batch: &RecordBatch, dest: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(dest)?);
        let mut writer = arrow_csv::WriterBuilder::new()
            .with_header(self.csv.has_header)
            .with_delimiter(self.csv.delimiter)
            .with_quote(self.csv.quote)
            .build(file);
        writer.write(batch)?;
        writer.into_inner().flush()?;
        Ok(())
    }
}

/// `dir/name.csv.gz` → `dir/.name.csv.tmp-<pid>`.
fn uncompressed_sibling(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    dest.with_file_name(format!(".{stem}.tmp-{}", std::process::id()))
}

/// Stacks batches row-wise, matching columns by name.
///
/// Zero-column batches (empty inputs) are skipped. The first remaining batch
/// fixes the column order; every other batch must have the same column names
/// and types, in any order.
pub fn concat_rows(tables: &[RecordBatch]) -> Result<RecordBatch> {
    let tables: Vec<&RecordBatch> = tables.iter().filter(|t| t.num_columns() > 0).collect();
    let Some(first) = tables.first() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };
    let schema = first.schema();
    let aligned = tables
        .iter()
        .map(|t| align_columns(&schema, t))
        .collect::<Result<Vec<_>>>()?;
    Ok(concat_batches(&schema, &aligned)?)
}

/// Reorders the columns of `table` to follow `schema`.
fn align_columns(schema: &SchemaRef, table: &RecordBatch) -> Result<RecordBatch> {
    let own = table.schema();
    let mismatch = || {
        let names = |s: &Schema| s.fields().iter().map(|f| f.name().as_str()).join(",");
        Error::SchemaMismatch(format!(
            "columns [{}] vs [{}]",
            names(schema.as_ref()),
            names(own.as_ref())
        ))
    };
    if own.fields().len() != schema.fields().len() {
        return Err(mismatch());
    }
    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let (i, found) = own.column_with_name(field.name()).ok_or_else(mismatch)?;
        if found.data_type() != field.data_type() {
            return Err(Error::SchemaMismatch(format!(
                "column {} is {} in one table and {} in another",
                field.name(),
                field.data_type(),
                found.data_type()
            )));
        }
        columns.push(table.column(i).clone());
    }
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Places batches side by side. Row counts must agree.
pub fn concat_cols(tables: &[RecordBatch]) -> Result<RecordBatch> {
    if tables.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }
    let mut fields = Vec::new();
    let mut columns = Vec::new();
    for t in tables {
        fields.extend(t.schema().fields().iter().cloned());
        columns.extend(t.columns().iter().cloned());
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
