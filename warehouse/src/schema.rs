use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use lazy_static::lazy_static;
use std::sync::Arc;

pub const RAW_ORDERS_TABLE: &str = "raw_orders";
pub const CLEAN_ORDERS_TABLE: &str = "clean_orders";
pub const DIM_DATE_TABLE: &str = "dim_date";
pub const DIM_LOCATION_TABLE: &str = "dim_location";
pub const DIM_RESTAURANT_TABLE: &str = "dim_restaurant";
pub const DIM_CATEGORY_TABLE: &str = "dim_category";
pub const DIM_DISH_TABLE: &str = "dim_dish";
pub const FACT_ORDERS_TABLE: &str = "fact_orders";

pub const INGEST_SEQ_COLUMN: &str = "ingest_seq";

pub const PRICE_PRECISION: u8 = 12;
pub const PRICE_SCALE: i8 = 2;

/// Columns whose blank value is reported by the validator.
pub const REQUIRED_TEXT_COLUMNS: [&str; 6] = [
    "state",
    "city",
    "restaurant_name",
    "location",
    "category",
    "dish_name",
];

/// Columns that make two raw records the same order.
pub const BUSINESS_COLUMNS: [&str; 10] = [
    "state",
    "city",
    "order_date",
    "restaurant_name",
    "location",
    "category",
    "dish_name",
    "price",
    "rating",
    "rating_count",
];

fn price_type() -> DataType {
    DataType::Decimal128(PRICE_PRECISION, PRICE_SCALE)
}

fn surrogate_key(name: &str) -> Field {
    Field::new(name, DataType::Int64, false)
}

// Raw feed, in source column order
pub fn raw_orders_schema() -> Schema {
    Schema::new(vec![
        Field::new("state", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("order_date", DataType::Date32, true),
        Field::new("restaurant_name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("category", DataType::Utf8, true),
        Field::new("dish_name", DataType::Utf8, true),
        Field::new("price", price_type(), true),
        Field::new("rating", DataType::Float64, true),
        Field::new("rating_count", DataType::Int64, true),
    ])
}

// Raw feed as staged inside a rebuild
pub fn staged_orders_schema() -> Schema {
    let raw_schema = raw_orders_schema();
    let mut field_vec: Vec<Field> = raw_schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    field_vec.push(Field::new(INGEST_SEQ_COLUMN, DataType::Int64, false));
    Schema::new(field_vec)
}

pub fn dim_date_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("date_id"),
        Field::new("full_date", DataType::Date32, false),
        Field::new("year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("month_name", DataType::Utf8, true),
        Field::new("quarter", DataType::Int32, true),
        Field::new("week", DataType::Int32, true),
        Field::new("day", DataType::Int32, true),
        Field::new("day_name", DataType::Utf8, true),
        Field::new("day_of_week", DataType::Int32, true),
    ])
}

pub fn dim_location_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("location_id"),
        Field::new("state", DataType::Utf8, false),
        Field::new("city", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, false),
    ])
}

pub fn dim_restaurant_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("restaurant_id"),
        Field::new("restaurant_name", DataType::Utf8, false),
    ])
}

pub fn dim_category_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("category_id"),
        Field::new("category", DataType::Utf8, false),
    ])
}

pub fn dim_dish_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("dish_id"),
        Field::new("dish_name", DataType::Utf8, false),
    ])
}

pub fn fact_orders_schema() -> Schema {
    Schema::new(vec![
        surrogate_key("order_id"),
        surrogate_key("date_id"),
        surrogate_key("location_id"),
        surrogate_key("restaurant_id"),
        surrogate_key("category_id"),
        surrogate_key("dish_id"),
        Field::new("price", price_type(), true),
        Field::new("rating", DataType::Float64, true),
        Field::new("rating_count", DataType::Int64, true),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseTable {
    RawOrders,
    StagedOrders,
    DimDate,
    DimLocation,
    DimRestaurant,
    DimCategory,
    DimDish,
    FactOrders,
}

pub fn get_schema(table: WarehouseTable) -> SchemaRef {
    match table {
        WarehouseTable::RawOrders => RAW_ORDERS_SCHEMA.clone(),
        WarehouseTable::StagedOrders => STAGED_ORDERS_SCHEMA.clone(),
        WarehouseTable::DimDate => DIM_DATE_SCHEMA.clone(),
        WarehouseTable::DimLocation => DIM_LOCATION_SCHEMA.clone(),
        WarehouseTable::DimRestaurant => DIM_RESTAURANT_SCHEMA.clone(),
        WarehouseTable::DimCategory => DIM_CATEGORY_SCHEMA.clone(),
        WarehouseTable::DimDish => DIM_DISH_SCHEMA.clone(),
        WarehouseTable::FactOrders => FACT_ORDERS_SCHEMA.clone(),
    }
}

// Lazy-loaded static schemas
lazy_static! {
    static ref RAW_ORDERS_SCHEMA: SchemaRef = Arc::new(raw_orders_schema());
    static ref STAGED_ORDERS_SCHEMA: SchemaRef = Arc::new(staged_orders_schema());
    static ref DIM_DATE_SCHEMA: SchemaRef = Arc::new(dim_date_schema());
    static ref DIM_LOCATION_SCHEMA: SchemaRef = Arc::new(dim_location_schema());
    static ref DIM_RESTAURANT_SCHEMA: SchemaRef = Arc::new(dim_restaurant_schema());
    static ref DIM_CATEGORY_SCHEMA: SchemaRef = Arc::new(dim_category_schema());
    static ref DIM_DISH_SCHEMA: SchemaRef = Arc::new(dim_dish_schema());
    static ref FACT_ORDERS_SCHEMA: SchemaRef = Arc::new(fact_orders_schema());
}
