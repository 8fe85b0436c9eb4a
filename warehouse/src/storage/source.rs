use crate::models::RawFeed;
use crate::schema::{WarehouseTable, get_schema};
use crate::utils::arrow::conform_batches;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use common::config::{SourceConfig, SourceFormat};
use common::{Error, Result};
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed raw order feed.
///
/// Columns are matched by name. A CSV header is normalized to snake_case
/// first, so `RestaurantName` and `Rating Count` both resolve. Headerless CSV
/// is read positionally in feed order (`state`, `city`, `order_date`,
/// `restaurant_name`, `location`, `category`, `dish_name`, `price`, `rating`,
/// `rating_count`).
pub struct RawSource {
    config: SourceConfig,
}

impl RawSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn file_extension(&self) -> String {
        let default = match self.config.format {
            SourceFormat::Csv => ".csv",
            SourceFormat::Parquet => ".parquet",
        };
        Path::new(&self.config.path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_else(|| default.to_string())
    }

    /// The first file a directory source would read, in name order.
    fn first_file(&self, extension: &str) -> Result<PathBuf> {
        let path = Path::new(&self.config.path);
        if !path.is_dir() {
            return Ok(path.to_path_buf());
        }

        let mut files = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with(extension))
            })
            .collect::<Vec<_>>();
        files.sort();

        files.into_iter().next().ok_or_else(|| {
            Error::InvalidInput(format!(
                "No {extension} files under {}",
                self.config.path
            ))
        })
    }

    /// All-text schema named after the CSV header. Values are cast to the
    /// feed types after the columns are matched by name.
    fn header_schema(&self, delimiter: u8, extension: &str) -> Result<Schema> {
        let file = File::open(self.first_file(extension)?)?;
        let (header, _) = Format::default()
            .with_header(true)
            .with_delimiter(delimiter)
            .infer_schema(file, Some(0))?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(header.fields().len());
        for field in header.fields() {
            let name = normalize_column_name(field.name());
            if !seen.insert(name.clone()) {
                return Err(Error::SchemaMismatch(format!(
                    "Duplicate column '{name}' in CSV header"
                )));
            }
            fields.push(Field::new(name, DataType::Utf8, true));
        }

        debug!(columns = fields.len(), "Read CSV header");
        Ok(Schema::new(fields))
    }

    pub async fn load(&self) -> Result<RawFeed> {
        let path = &self.config.path;
        if !Path::new(path).exists() {
            return Err(Error::InvalidInput(format!("Source not found: {path}")));
        }

        let ctx = SessionContext::new();
        let schema = get_schema(WarehouseTable::RawOrders);
        let extension = self.file_extension();

        let df = match self.config.format {
            SourceFormat::Csv => {
                if !self.config.delimiter.is_ascii() {
                    return Err(Error::InvalidInput(format!(
                        "CSV delimiter must be a single ASCII character, got {:?}",
                        self.config.delimiter
                    )));
                }
                let delimiter = self.config.delimiter as u8;
                let read_schema = if self.config.has_header {
                    self.header_schema(delimiter, &extension)?
                } else {
                    schema.as_ref().clone()
                };
                let options = CsvReadOptions::new()
                    .schema(&read_schema)
                    .has_header(self.config.has_header)
                    .delimiter(delimiter)
                    .file_extension(&extension);
                ctx.read_csv(path.as_str(), options).await?
            }
            SourceFormat::Parquet => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                ctx.read_parquet(path.as_str(), options).await?
            }
        };

        let batches = conform_batches(&df.collect().await?, &schema)?;
        let feed = RawFeed::new(batches);

        info!(
            path = %path,
            format = ?self.config.format,
            records = feed.num_rows(),
            "Loaded raw feed"
        );

        Ok(feed)
    }
}

/// `RestaurantName`, `restaurant name` and `restaurant-name` all become
/// `restaurant_name`.
fn normalize_column_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;

    for c in name.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !normalized.ends_with('_') {
                normalized.push('_');
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            normalized.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        normalized.extend(c.to_lowercase());
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::raw_orders_to_batch;
    use crate::test_support::order;
    use crate::utils::arrow::batches_to_json;
    use parquet::arrow::ArrowWriter;
    use std::fs;
    use tempfile::TempDir;

    fn source(path: &Path, format: SourceFormat) -> RawSource {
        RawSource::new(SourceConfig {
            path: path.to_string_lossy().into_owned(),
            format,
            has_header: true,
            delimiter: ',',
        })
    }

    #[tokio::test]
    async fn test_loads_csv_with_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "state,city,order_date,restaurant_name,location,category,dish_name,price,rating,rating_count\n\
             TX,Austin,2024-01-01,R1,L1,Pizza,Margherita,200.00,4.5,10\n\
             TX,Austin,,R1,L1,Pizza,Margherita,199.5,,\n",
        )
        .unwrap();

        let feed = source(&path, SourceFormat::Csv).load().await.unwrap();

        assert_eq!(feed.num_rows(), 2);
        let rows = batches_to_json(feed.batches()).unwrap();
        assert_eq!(rows[0]["order_date"], "2024-01-01");
        assert_eq!(rows[0]["price"], "200.00");
        assert_eq!(rows[0]["rating_count"], 10);
        assert!(rows[1]["order_date"].is_null());
        assert!(rows[1]["rating"].is_null());
        assert_eq!(rows[1]["price"], "199.50");
    }

    #[tokio::test]
    async fn test_csv_header_order_does_not_matter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "city,state,order_date,restaurant_name,location,category,dish_name,price,rating,rating_count\n\
             Austin,TX,2024-01-01,R1,L1,Pizza,Margherita,200.00,4.5,10\n",
        )
        .unwrap();

        let feed = source(&path, SourceFormat::Csv).load().await.unwrap();

        let rows = batches_to_json(feed.batches()).unwrap();
        assert_eq!(feed.batches()[0].schema(), get_schema(WarehouseTable::RawOrders));
        assert_eq!(rows[0]["state"], "TX");
        assert_eq!(rows[0]["city"], "Austin");
        assert_eq!(rows[0]["rating_count"], 10);
    }

    #[tokio::test]
    async fn test_csv_header_names_are_normalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "State,City,Location,RestaurantName,Category,Dish Name,Price,Rating,Rating-Count,Order Date\n\
             TX,Austin,L1,R1,Pizza,Margherita,150.5,4.0,7,2024-02-03\n",
        )
        .unwrap();

        let feed = source(&path, SourceFormat::Csv).load().await.unwrap();

        let rows = batches_to_json(feed.batches()).unwrap();
        assert_eq!(rows[0]["restaurant_name"], "R1");
        assert_eq!(rows[0]["location"], "L1");
        assert_eq!(rows[0]["dish_name"], "Margherita");
        assert_eq!(rows[0]["order_date"], "2024-02-03");
        assert_eq!(rows[0]["price"], "150.50");
        assert_eq!(rows[0]["rating_count"], 7);
    }

    #[tokio::test]
    async fn test_csv_header_missing_column_is_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "state,city,order_date,restaurant_name,location,category,dish_name,price,rating\n\
             TX,Austin,2024-01-01,R1,L1,Pizza,Margherita,200.00,4.5\n",
        )
        .unwrap();

        let err = source(&path, SourceFormat::Csv).load().await.unwrap_err();

        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("RestaurantName"), "restaurant_name");
        assert_eq!(normalize_column_name(" Rating Count "), "rating_count");
        assert_eq!(normalize_column_name("order-date"), "order_date");
        assert_eq!(normalize_column_name("dish_name"), "dish_name");
    }

    #[tokio::test]
    async fn test_loads_csv_with_custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.txt");
        fs::write(
            &path,
            "TX;Austin;2024-01-01;R1;L1;Pizza;Margherita;200;4.5;10\n",
        )
        .unwrap();

        let feed = RawSource::new(SourceConfig {
            path: path.to_string_lossy().into_owned(),
            format: SourceFormat::Csv,
            has_header: false,
            delimiter: ';',
        })
        .load()
        .await
        .unwrap();

        assert_eq!(feed.num_rows(), 1);
    }

    #[tokio::test]
    async fn test_loads_parquet_by_column_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.parquet");
        let batch = raw_orders_to_batch(&[order(
            "TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0,
        )])
        .unwrap();
        let reordered = batch.project(&[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]).unwrap();
        let mut writer =
            ArrowWriter::try_new(fs::File::create(&path).unwrap(), reordered.schema(), None).unwrap();
        writer.write(&reordered).unwrap();
        writer.close().unwrap();

        let feed = source(&path, SourceFormat::Parquet).load().await.unwrap();

        let rows = batches_to_json(feed.batches()).unwrap();
        assert_eq!(feed.batches()[0].schema(), get_schema(WarehouseTable::RawOrders));
        assert_eq!(rows[0]["state"], "TX");
        assert_eq!(rows[0]["dish_name"], "Margherita");
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let err = source(&dir.path().join("nope.csv"), SourceFormat::Csv)
            .load()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
