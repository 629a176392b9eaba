use thiserror::Error;

/// Fatal startup failure while loading the order or market series.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("I/O error reading {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unsupported source format for {source_name}, expected .csv or .parquet")]
    UnsupportedFormat { source_name: String },

    #[error("{source_name} is missing required column {column}")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name} contains no rows")]
    Empty { source_name: String },

    #[error("{source_name} row {row}: {message}")]
    InvalidData {
        source_name: String,
        row: usize,
        message: String,
    },
}

impl DataLoadError {
    pub(crate) fn io(source_name: impl Into<String>, error: std::io::Error) -> Self {
        Self::Io {
            source_name: source_name.into(),
            error,
        }
    }

    pub(crate) fn invalid(
        source_name: impl Into<String>,
        row: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidData {
            source_name: source_name.into(),
            row,
            message: message.into(),
        }
    }
}
