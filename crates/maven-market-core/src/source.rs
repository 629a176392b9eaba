//! Tabular sources for the order and market series.
//!
//! Both CSV and Parquet files are read into a [`Table`] of string cells so
//! that a single row parser handles either format.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use arrow::array::{Array, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::error::DataLoadError;
use crate::record::{MarketPriceRecord, OrderRecord};
use crate::timestamp::parse_naive_date;

pub const DATE_COLUMN: &str = "Date";
pub const PRODUCT_COLUMN: &str = "Product";
pub const BAG_PRICE_COLUMN: &str = "BagPrice";
pub const BAGS_COLUMN: &str = "Bags";
pub const MARKET_PRICE_COLUMNS: &[&str] = &["MarketPrices", "MarketPrice"];

/// Header plus string cells, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    source_name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(
        source_name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            headers,
            rows,
        }
    }

    /// Read a `.csv` or `.parquet` file, chosen by extension.
    pub fn read(path: &Path) -> Result<Self, DataLoadError> {
        let source_name = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => {
                let file = File::open(path).map_err(|e| DataLoadError::io(&source_name, e))?;
                Self::from_csv_reader(source_name, file)
            }
            Some("parquet") => {
                let file = File::open(path).map_err(|e| DataLoadError::io(&source_name, e))?;
                Self::from_parquet_file(source_name, file)
            }
            _ => Err(DataLoadError::UnsupportedFormat { source_name }),
        }
    }

    pub fn from_csv_reader<R: Read>(
        source_name: impl Into<String>,
        reader: R,
    ) -> Result<Self, DataLoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(source_name, headers, rows))
    }

    pub fn from_parquet_file(
        source_name: impl Into<String>,
        file: File,
    ) -> Result<Self, DataLoadError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let headers: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let reader = builder.build()?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let mut columns = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                if can_cast_types(column.data_type(), &DataType::Utf8) {
                    columns.push(Some(cast(column, &DataType::Utf8)?));
                } else {
                    columns.push(None);
                }
            }

            for i in 0..batch.num_rows() {
                let row = columns
                    .iter()
                    .map(|column| {
                        column
                            .as_ref()
                            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                            .filter(|c| !c.is_null(i))
                            .map(|c| c.value(i).to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                rows.push(row);
            }
        }

        Ok(Self::new(source_name, headers, rows))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first of `names` present in the header.
    /// Exact matches win over case-insensitive ones.
    pub fn column(&self, names: &[&str]) -> Result<usize, DataLoadError> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|h| h == name))
            .or_else(|| {
                names.iter().find_map(|name| {
                    self.headers
                        .iter()
                        .position(|h| h.eq_ignore_ascii_case(name))
                })
            })
            .ok_or_else(|| DataLoadError::MissingColumn {
                source_name: self.source_name.clone(),
                column: names[0].to_string(),
            })
    }

    fn ensure_not_empty(&self) -> Result<(), DataLoadError> {
        if self.is_empty() {
            return Err(DataLoadError::Empty {
                source_name: self.source_name.clone(),
            });
        }
        Ok(())
    }

    /// Iterate rows with their 1-based data row number.
    fn rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows.iter().enumerate().map(|(i, r)| (i + 1, r.as_slice()))
    }

    fn cell<'a>(&self, row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(|s| s.trim()).unwrap_or("")
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn parse_count(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        parse_decimal(raw)
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_i64())
    })
}

fn required<'a>(
    table: &Table,
    row_number: usize,
    raw: &'a str,
    column: &str,
) -> Result<&'a str, DataLoadError> {
    if raw.is_empty() {
        return Err(DataLoadError::invalid(
            table.source_name(),
            row_number,
            format!("missing {column}"),
        ));
    }
    Ok(raw)
}

fn date_cell(
    table: &Table,
    row_number: usize,
    raw: &str,
) -> Result<chrono::NaiveDate, DataLoadError> {
    let raw = required(table, row_number, raw, DATE_COLUMN)?;
    parse_naive_date(raw).ok_or_else(|| {
        DataLoadError::invalid(
            table.source_name(),
            row_number,
            format!("invalid {DATE_COLUMN} '{raw}'"),
        )
    })
}

fn decimal_cell(
    table: &Table,
    row_number: usize,
    raw: &str,
    column: &str,
) -> Result<Decimal, DataLoadError> {
    let raw = required(table, row_number, raw, column)?;
    parse_decimal(raw).ok_or_else(|| {
        DataLoadError::invalid(
            table.source_name(),
            row_number,
            format!("invalid {column} '{raw}'"),
        )
    })
}

/// Convert an order table into records, in file order.
pub fn orders_from_table(table: &Table) -> Result<Vec<OrderRecord>, DataLoadError> {
    let date_idx = table.column(&[DATE_COLUMN])?;
    let product_idx = table.column(&[PRODUCT_COLUMN])?;
    let price_idx = table.column(&[BAG_PRICE_COLUMN])?;
    let bags_idx = table.column(&[BAGS_COLUMN])?;
    table.ensure_not_empty()?;

    let mut orders = Vec::with_capacity(table.len());
    for (row_number, row) in table.rows() {
        let date = date_cell(table, row_number, table.cell(row, date_idx))?;
        let bag_price = decimal_cell(
            table,
            row_number,
            table.cell(row, price_idx),
            BAG_PRICE_COLUMN,
        )?;

        let raw_bags = required(table, row_number, table.cell(row, bags_idx), BAGS_COLUMN)?;
        let bags = parse_count(raw_bags).ok_or_else(|| {
            DataLoadError::invalid(
                table.source_name(),
                row_number,
                format!("invalid {BAGS_COLUMN} '{raw_bags}'"),
            )
        })?;

        orders.push(OrderRecord {
            date,
            product: table.cell(row, product_idx).to_string(),
            bag_price,
            bags,
        });
    }

    debug!("{}: parsed {} order(s)", table.source_name(), orders.len());
    Ok(orders)
}

/// Convert a market price table into records, in file order.
pub fn market_prices_from_table(table: &Table) -> Result<Vec<MarketPriceRecord>, DataLoadError> {
    let date_idx = table.column(&[DATE_COLUMN])?;
    let price_idx = table.column(MARKET_PRICE_COLUMNS)?;
    table.ensure_not_empty()?;

    let mut prices = Vec::with_capacity(table.len());
    for (row_number, row) in table.rows() {
        prices.push(MarketPriceRecord {
            date: date_cell(table, row_number, table.cell(row, date_idx))?,
            market_price: decimal_cell(
                table,
                row_number,
                table.cell(row, price_idx),
                MARKET_PRICE_COLUMNS[0],
            )?,
        });
    }

    debug!("{}: parsed {} market price(s)", table.source_name(), prices.len());
    Ok(prices)
}

pub fn load_orders(path: &Path) -> Result<Vec<OrderRecord>, DataLoadError> {
    orders_from_table(&Table::read(path)?)
}

pub fn load_market_prices(path: &Path) -> Result<Vec<MarketPriceRecord>, DataLoadError> {
    market_prices_from_table(&Table::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Date32Array, Float64Array, TimestampMicrosecondArray};
    use arrow::datatypes::{Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn csv_table(body: &str) -> Table {
        Table::from_csv_reader("test.csv", body.as_bytes()).unwrap()
    }

    #[test]
    fn parses_orders_csv() {
        let table = csv_table(
            "Date,Product,BagPrice,Bags\n\
             2023-01-01,Arabica,10.00,5\n\
             2023-02-01 00:00:00-05:00, Arabica ,12.00,6\n",
        );
        let orders = orders_from_table(&table).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].date, date(2023, 1, 1));
        assert_eq!(orders[0].bag_price, dec!(10.00));
        assert_eq!(orders[1].date, date(2023, 2, 1));
        assert_eq!(orders[1].product, "Arabica");
        assert_eq!(orders[1].bags, 6);
    }

    #[test]
    fn columns_can_be_reordered_and_extra() {
        let table = csv_table(
            "Bags,Notes,BagPrice,Date,Product\n\
             7.0,rush,9.5,2023-05-04,Robusta\n",
        );
        let orders = orders_from_table(&table).unwrap();
        assert_eq!(orders[0].bags, 7);
        assert_eq!(orders[0].bag_price, dec!(9.5));
        assert_eq!(orders[0].product, "Robusta");
    }

    #[test]
    fn market_price_alias_and_case() {
        let table = csv_table("date,marketprice\n2023-01-01,4.0\n");
        let prices = market_prices_from_table(&table).unwrap();
        assert_eq!(prices[0].market_price, dec!(4.0));

        let table = csv_table("Date,MarketPrices\n2023-01-01,1.5e2\n");
        let prices = market_prices_from_table(&table).unwrap();
        assert_eq!(prices[0].market_price, dec!(150));
    }

    #[test]
    fn missing_column_is_reported() {
        let table = csv_table("Date,Product,Bags\n2023-01-01,Arabica,5\n");
        let err = orders_from_table(&table).unwrap_err();
        match err {
            DataLoadError::MissingColumn { column, .. } => assert_eq!(column, "BagPrice"),
            other => panic!("expected MissingColumn, got {other}"),
        }
    }

    #[test]
    fn header_only_is_empty() {
        let table = csv_table("Date,MarketPrices\n");
        assert!(matches!(
            market_prices_from_table(&table),
            Err(DataLoadError::Empty { .. })
        ));
    }

    #[test]
    fn bad_cells_report_row_number() {
        let table = csv_table(
            "Date,Product,BagPrice,Bags\n\
             2023-01-01,Arabica,10.00,5\n\
             2023-01-02,Arabica,ten,5\n",
        );
        match orders_from_table(&table).unwrap_err() {
            DataLoadError::InvalidData { row, message, .. } => {
                assert_eq!(row, 2);
                assert!(message.contains("BagPrice"));
            }
            other => panic!("expected InvalidData, got {other}"),
        }

        let table = csv_table("Date,Product,BagPrice,Bags\n2023-01-01,Arabica,10.00,2.5\n");
        assert!(matches!(
            orders_from_table(&table),
            Err(DataLoadError::InvalidData { row: 1, .. })
        ));

        let table = csv_table("Date,MarketPrices\n,4.0\n");
        assert!(matches!(
            market_prices_from_table(&table),
            Err(DataLoadError::InvalidData { row: 1, .. })
        ));
    }

    #[test]
    fn empty_product_is_kept() {
        let table = csv_table("Date,Product,BagPrice,Bags\n2023-01-01,,10.00,5\n");
        let orders = orders_from_table(&table).unwrap();
        assert_eq!(orders[0].product, "");
    }

    #[test]
    fn read_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.xlsx");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            Table::read(&path),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_orders(&dir.path().join("nope.csv")),
            Err(DataLoadError::Io { .. })
        ));
    }

    fn write_parquet(path: &Path, fields: Vec<Field>, columns: Vec<ArrayRef>) {
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn load_orders_from_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maven_orders.parquet");

        // 2023-01-01 22:00 at -05:00 is already Jan 2 in UTC
        let micros = vec![1_672_628_400_000_000_i64, 1_675_209_600_000_000];
        write_parquet(
            &path,
            vec![
                Field::new(
                    "Date",
                    DataType::Timestamp(TimeUnit::Microsecond, Some("-05:00".into())),
                    false,
                ),
                Field::new("Product", DataType::Utf8, false),
                Field::new("BagPrice", DataType::Float64, false),
                Field::new("Bags", DataType::Float64, false),
            ],
            vec![
                Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("-05:00")),
                Arc::new(StringArray::from(vec!["Arabica", "Robusta"])),
                Arc::new(Float64Array::from(vec![10.25, 12.0])),
                Arc::new(Float64Array::from(vec![5.0, 6.0])),
            ],
        );

        let orders = load_orders(&path).unwrap();
        assert_eq!(
            orders[0],
            OrderRecord {
                date: date(2023, 1, 1),
                product: "Arabica".into(),
                bag_price: dec!(10.25),
                bags: 5,
            }
        );
        assert_eq!(orders[1].date, date(2023, 1, 31));
        assert_eq!(orders[1].bag_price, dec!(12));
        assert_eq!(orders[1].bags, 6);
    }

    #[test]
    fn load_market_prices_from_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffee_market.parquet");

        // Date32 days since 1970-01-01
        write_parquet(
            &path,
            vec![
                Field::new("Date", DataType::Date32, false),
                Field::new("MarketPrices", DataType::Float64, true),
            ],
            vec![
                Arc::new(Date32Array::from(vec![19_358, 19_389])),
                Arc::new(Float64Array::from(vec![4.0, 5.5])),
            ],
        );

        let prices = load_market_prices(&path).unwrap();
        assert_eq!(
            prices,
            vec![
                MarketPriceRecord {
                    date: date(2023, 1, 1),
                    market_price: dec!(4),
                },
                MarketPriceRecord {
                    date: date(2023, 2, 1),
                    market_price: dec!(5.5),
                },
            ]
        );
    }

    #[test]
    fn parquet_null_price_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffee_market.parquet");
        write_parquet(
            &path,
            vec![
                Field::new("Date", DataType::Date32, false),
                Field::new("MarketPrices", DataType::Float64, true),
            ],
            vec![
                Arc::new(Date32Array::from(vec![19_358, 19_389])),
                Arc::new(Float64Array::from(vec![Some(4.0), None])),
            ],
        );

        assert!(matches!(
            load_market_prices(&path),
            Err(DataLoadError::InvalidData { row: 2, .. })
        ));
    }

    #[test]
    fn load_market_prices_from_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coffee_market.csv");
        std::fs::write(&path, "Date,MarketPrices\n2023-01-02,4.0\n2023-01-01,3.5\n").unwrap();
        let prices = load_market_prices(&path).unwrap();
        // file order is preserved; sorting happens in the snapshot
        assert_eq!(prices[0].date, date(2023, 1, 2));
        assert_eq!(prices[1].market_price, dec!(3.5));
    }
}
