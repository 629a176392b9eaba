use std::path::Path;

use maven_market_core::record::MarketPriceRecord;
use maven_market_core::source::{DATE_COLUMN, MARKET_PRICE_COLUMNS};

use crate::error::ProviderError;

/// Write prices in the layout the dashboard loads (`Date,MarketPrices`).
pub fn write_market_csv(path: &Path, prices: &[MarketPriceRecord]) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([DATE_COLUMN, MARKET_PRICE_COLUMNS[0]])?;
    for price in prices {
        writer.write_record([
            price.date.format("%Y-%m-%d").to_string(),
            price.market_price.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
