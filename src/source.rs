use polars::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace};
use tracing_error::SpanTrace;

use crate::domain::TVError;
use crate::record::Record;

const BUNDLED_DATA: &str = include_str!("../data/records.json");

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

impl FileInfo {
    fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

/// Read-only provider of records.
pub trait RecordSource {
    fn name(&self) -> String;

    /// Records `[skip, skip + limit)`. `limit = usize::MAX` returns everything
    /// after `skip`.
    fn fetch(&self, skip: usize, limit: usize) -> Result<Vec<Record>, TVError>;
}

/// The dataset a session works on.
#[derive(Debug, Default)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Record>,
}

// Shape of the json data files: `{"data_items": [{...}, ...]}`
#[derive(Deserialize)]
struct RawDataset {
    data_items: Vec<Map<String, Value>>,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_json(text: &str, skip: usize, limit: usize) -> Result<Vec<Record>, TVError> {
    let raw: RawDataset = serde_json::from_str(text)?;
    Ok(raw
        .data_items
        .iter()
        .skip(skip)
        .take(limit)
        .map(|item| Record::from_pairs(item.iter().map(|(k, v)| (k.as_str(), value_text(v)))))
        .collect())
}

/// Records compiled into the binary.
#[derive(Debug, Default)]
pub struct BundledSource;

impl RecordSource for BundledSource {
    fn name(&self) -> String {
        "bundled".to_string()
    }

    fn fetch(&self, skip: usize, limit: usize) -> Result<Vec<Record>, TVError> {
        parse_json(BUNDLED_DATA, skip, limit)
    }
}

#[derive(Debug)]
pub struct JsonFileSource {
    info: FileInfo,
}

impl RecordSource for JsonFileSource {
    fn name(&self) -> String {
        self.info.name()
    }

    fn fetch(&self, skip: usize, limit: usize) -> Result<Vec<Record>, TVError> {
        let text = fs::read_to_string(&self.info.path)?;
        parse_json(&text, skip, limit)
    }
}

/// Csv, parquet or arrow files, read with polars. Every column is read as
/// text and matched to a record field by its header.
#[derive(Debug)]
pub struct TabularFileSource {
    info: FileInfo,
}

struct TextColumn {
    name: String,
    data: Vec<String>,
}

impl TabularFileSource {
    fn load_column(df: &DataFrame, col_name: &str) -> Result<TextColumn, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let mut data = Vec::with_capacity(series.len());
        for value in series.into_iter() {
            data.push(value.map(|s| s.to_string()).unwrap_or_default());
        }
        Ok(TextColumn {
            name: col_name.to_string(),
            data,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        // No schema inference, every column stays text
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

impl RecordSource for TabularFileSource {
    fn name(&self) -> String {
        self.info.name()
    }

    fn fetch(&self, skip: usize, limit: usize) -> Result<Vec<Record>, TVError> {
        let frame = match self.info.file_type {
            FileType::CSV => Self::load_csv(&self.info.path)?,
            FileType::PARQUET => Self::load_parquet(&self.info.path)?,
            FileType::ARROW => Self::load_arrow(&self.info.path)?,
            FileType::JSON => return Err(TVError::UnknownFileType),
        };

        // Each column is converted to text in its own rayon task.
        let start_time = Instant::now();
        let df = frame.collect()?;
        let columns: Result<Vec<TextColumn>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let columns = columns?;
        for c in columns.iter() {
            debug!("Column \"{}\", # rows {}", c.name, c.data.len());
        }

        let records = (0..df.height())
            .skip(skip)
            .take(limit)
            .map(|row| {
                Record::from_pairs(
                    columns
                        .iter()
                        .map(|c| (c.name.as_str(), c.data[row].clone())),
                )
            })
            .collect::<Vec<Record>>();

        info!(
            "Converted {} rows in {}ms ...",
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

/// Picks the source for `path`. Without a path the bundled records are used.
/// `~` and environment variables in the path are expanded.
pub fn open_source(path: Option<&str>) -> Result<Box<dyn RecordSource>, TVError> {
    let Some(path) = path else {
        return Ok(Box::new(BundledSource));
    };
    let expanded =
        shellexpand::full(path).map_err(|e| TVError::LoadingFailed(e.to_string()))?;
    let info = get_file_info(PathBuf::from(expanded.as_ref()))?;
    trace!("Opening {:?} ({} bytes)", info.path, info.file_size);

    match info.file_type {
        FileType::JSON => Ok(Box::new(JsonFileSource { info })),
        _ => Ok(Box::new(TabularFileSource { info })),
    }
}

/// Fetches the complete dataset once. A failing source is logged and yields
/// an empty dataset.
#[instrument(skip(source), fields(source = %source.name()))]
pub fn load_dataset(source: &dyn RecordSource) -> Vec<Record> {
    match source.fetch(0, usize::MAX) {
        Ok(records) => {
            info!("Loaded {} records", records.len());
            records
        }
        Err(e) => {
            error!("Error fetching data: {e}\n{}", SpanTrace::capture());
            Vec::new()
        }
    }
}

/// Opens and loads `path` (or the bundled records). Never fails, see
/// [`load_dataset`].
pub fn load(path: Option<&str>) -> Dataset {
    match open_source(path) {
        Ok(source) => Dataset {
            name: source.name(),
            records: load_dataset(source.as_ref()),
        },
        Err(e) => {
            error!("Error opening {:?}: {e}\n{}", path, SpanTrace::capture());
            Dataset {
                name: path.unwrap_or_default().to_string(),
                records: Vec::new(),
            }
        }
    }
}
