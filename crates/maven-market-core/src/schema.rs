use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;

use crate::candle::MarketCandle;
use crate::error::DataLoadError;

/// `num_days_from_ce` of 1970-01-01, the Date32 epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn candle_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("open", DataType::Utf8, false),
        Field::new("high", DataType::Utf8, false),
        Field::new("low", DataType::Utf8, false),
        Field::new("close", DataType::Utf8, false),
    ])
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn string_column<F>(candles: &[MarketCandle], field: F) -> ArrayRef
where
    F: Fn(&MarketCandle) -> String,
{
    let values: Vec<String> = candles.iter().map(field).collect();
    Arc::new(StringArray::from(
        values.iter().map(|s| s.as_str()).collect::<Vec<&str>>(),
    ))
}

pub fn candles_to_record_batch(candles: &[MarketCandle]) -> Result<RecordBatch, DataLoadError> {
    let schema = Arc::new(candle_schema());

    let dates: Vec<i32> = candles.iter().map(|c| days_since_epoch(c.date)).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(dates)),
        string_column(candles, |c| c.open.to_string()),
        string_column(candles, |c| c.high.to_string()),
        string_column(candles, |c| c.low.to_string()),
        string_column(candles, |c| c.close.to_string()),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn string_at<'a>(
    batch: &'a RecordBatch,
    index: usize,
    name: &str,
) -> Result<&'a StringArray, DataLoadError> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DataLoadError::invalid("candles", 0, format!("expected {name} column")))
}

pub fn record_batch_to_candles(batch: &RecordBatch) -> Result<Vec<MarketCandle>, DataLoadError> {
    let dates = batch
        .column(0)
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| DataLoadError::invalid("candles", 0, "expected date column"))?;
    let opens = string_at(batch, 1, "open")?;
    let highs = string_at(batch, 2, "high")?;
    let lows = string_at(batch, 3, "low")?;
    let closes = string_at(batch, 4, "close")?;

    let decimal = |array: &StringArray, i: usize, name: &str| {
        array
            .value(i)
            .parse::<Decimal>()
            .map_err(|e| DataLoadError::invalid("candles", i + 1, format!("invalid {name}: {e}")))
    };

    let mut candles = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let days = dates.value(i);
        let date = days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or_else(|| {
                DataLoadError::invalid("candles", i + 1, format!("invalid date: {days}"))
            })?;

        candles.push(MarketCandle {
            date,
            open: decimal(opens, i, "open")?,
            high: decimal(highs, i, "high")?,
            low: decimal(lows, i, "low")?,
            close: decimal(closes, i, "close")?,
        });
    }

    Ok(candles)
}

pub fn write_candles_parquet(path: &Path, candles: &[MarketCandle]) -> Result<(), DataLoadError> {
    let batch = candles_to_record_batch(candles)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path)
        .map_err(|e| DataLoadError::io(path.display().to_string(), e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub fn read_candles_parquet(path: &Path) -> Result<Vec<MarketCandle>, DataLoadError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DataLoadError::io(path.display().to_string(), e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut all_candles = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut candles = record_batch_to_candles(&batch)?;
        all_candles.append(&mut candles);
    }

    Ok(all_candles)
}
