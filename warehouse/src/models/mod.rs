mod feed;
mod order;

pub use feed::RawFeed;
pub use order::{RawOrder, raw_orders_to_batch};
pub(crate) use order::days_to_date;
#[cfg(test)]
pub(crate) use order::date_to_days;
