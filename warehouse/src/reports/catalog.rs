use crate::schema::{
    DIM_CATEGORY_TABLE, DIM_DATE_TABLE, DIM_DISH_TABLE, DIM_LOCATION_TABLE, DIM_RESTAURANT_TABLE,
    FACT_ORDERS_TABLE,
};
use common::Error;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const TOP_N: usize = 10;
const RESTAURANTS_PER_CITY: usize = 3;
const DISHES_PER_CATEGORY: usize = 5;

/// The fixed battery of analytical reports over the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    Kpis,
    OrdersByYear,
    OrdersByQuarter,
    OrdersByMonth,
    OrdersByWeek,
    OrdersByWeekday,
    TopCities,
    TopRestaurants,
    TopDishes,
    OrdersByCategory,
    OrdersByPriceRange,
    RatingDistribution,
    TopRestaurantsPerCity,
    TopDishesPerCategory,
    RunningMonthlyRevenue,
}

impl Report {
    pub const ALL: [Report; 15] = [
        Report::Kpis,
        Report::OrdersByYear,
        Report::OrdersByQuarter,
        Report::OrdersByMonth,
        Report::OrdersByWeek,
        Report::OrdersByWeekday,
        Report::TopCities,
        Report::TopRestaurants,
        Report::TopDishes,
        Report::OrdersByCategory,
        Report::OrdersByPriceRange,
        Report::RatingDistribution,
        Report::TopRestaurantsPerCity,
        Report::TopDishesPerCategory,
        Report::RunningMonthlyRevenue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Report::Kpis => "kpis",
            Report::OrdersByYear => "orders_by_year",
            Report::OrdersByQuarter => "orders_by_quarter",
            Report::OrdersByMonth => "orders_by_month",
            Report::OrdersByWeek => "orders_by_week",
            Report::OrdersByWeekday => "orders_by_weekday",
            Report::TopCities => "top_cities",
            Report::TopRestaurants => "top_restaurants",
            Report::TopDishes => "top_dishes",
            Report::OrdersByCategory => "orders_by_category",
            Report::OrdersByPriceRange => "orders_by_price_range",
            Report::RatingDistribution => "rating_distribution",
            Report::TopRestaurantsPerCity => "top_restaurants_per_city",
            Report::TopDishesPerCategory => "top_dishes_per_category",
            Report::RunningMonthlyRevenue => "running_monthly_revenue",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Report::Kpis => "Total orders, total revenue, average price and average rating",
            Report::OrdersByYear => "Order count per year",
            Report::OrdersByQuarter => "Order count per year and quarter",
            Report::OrdersByMonth => "Order count per year and month",
            Report::OrdersByWeek => "Order count per year and ISO week",
            Report::OrdersByWeekday => "Order count per day of week, Monday first",
            Report::TopCities => "Ten cities with the most orders",
            Report::TopRestaurants => "Ten restaurants with the most orders",
            Report::TopDishes => "Ten dishes with the most orders",
            Report::OrdersByCategory => "Order count per category",
            Report::OrdersByPriceRange => "Order count per price bucket",
            Report::RatingDistribution => "Order count per rating value",
            Report::TopRestaurantsPerCity => "Three busiest restaurants in each city",
            Report::TopDishesPerCategory => "Five busiest dishes in each category, ties share a rank",
            Report::RunningMonthlyRevenue => "Monthly revenue with its cumulative total",
        }
    }

    pub fn sql(&self) -> String {
        match self {
            Report::Kpis => format!(
                "SELECT COUNT(*) AS total_orders, \
                        COALESCE(SUM(CAST(price AS DOUBLE)), 0.0) AS total_revenue, \
                        AVG(CAST(price AS DOUBLE)) AS average_price, \
                        AVG(rating) AS average_rating \
                 FROM {FACT_ORDERS_TABLE}"
            ),
            Report::OrdersByYear => format!(
                "SELECT d.\"year\" AS \"year\", COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                 GROUP BY d.\"year\" \
                 ORDER BY \"year\""
            ),
            Report::OrdersByQuarter => format!(
                "SELECT d.\"year\" AS \"year\", d.\"quarter\" AS \"quarter\", COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                 GROUP BY d.\"year\", d.\"quarter\" \
                 ORDER BY \"year\", \"quarter\""
            ),
            Report::OrdersByMonth => format!(
                "SELECT d.\"year\" AS \"year\", d.\"month\" AS \"month\", d.month_name AS month_name, \
                        COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                 GROUP BY d.\"year\", d.\"month\", d.month_name \
                 ORDER BY \"year\", \"month\""
            ),
            Report::OrdersByWeek => format!(
                "SELECT d.\"year\" AS \"year\", d.\"week\" AS \"week\", COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                 GROUP BY d.\"year\", d.\"week\" \
                 ORDER BY \"year\", \"week\""
            ),
            Report::OrdersByWeekday => format!(
                "SELECT d.day_of_week AS day_of_week, d.day_name AS day_name, COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                 GROUP BY d.day_of_week, d.day_name \
                 ORDER BY day_of_week"
            ),
            Report::TopCities => top_by_volume(DIM_LOCATION_TABLE, "location_id", "city", Some(TOP_N)),
            Report::TopRestaurants => top_by_volume(
                DIM_RESTAURANT_TABLE,
                "restaurant_id",
                "restaurant_name",
                Some(TOP_N),
            ),
            Report::TopDishes => top_by_volume(DIM_DISH_TABLE, "dish_id", "dish_name", Some(TOP_N)),
            Report::OrdersByCategory => {
                top_by_volume(DIM_CATEGORY_TABLE, "category_id", "category", None)
            }
            Report::OrdersByPriceRange => format!(
                "SELECT price_range, COUNT(*) AS total_orders \
                 FROM ( \
                     SELECT CASE \
                         WHEN CAST(price AS DOUBLE) < 100 THEN 'Under 100' \
                         WHEN CAST(price AS DOUBLE) BETWEEN 100 AND 199 THEN '100 - 199' \
                         WHEN CAST(price AS DOUBLE) BETWEEN 200 AND 299 THEN '200 - 299' \
                         WHEN CAST(price AS DOUBLE) BETWEEN 300 AND 399 THEN '300 - 399' \
                         ELSE '500+' \
                     END AS price_range \
                     FROM {FACT_ORDERS_TABLE} \
                 ) buckets \
                 GROUP BY price_range \
                 ORDER BY total_orders DESC, price_range ASC"
            ),
            Report::RatingDistribution => format!(
                "SELECT rating, COUNT(*) AS total_orders \
                 FROM {FACT_ORDERS_TABLE} \
                 GROUP BY rating \
                 ORDER BY total_orders DESC, rating DESC NULLS LAST"
            ),
            Report::TopRestaurantsPerCity => format!(
                "SELECT city, restaurant_name, total_orders, restaurant_rank \
                 FROM ( \
                     SELECT city, restaurant_name, total_orders, \
                            CAST(ROW_NUMBER() OVER ( \
                                PARTITION BY city ORDER BY total_orders DESC, restaurant_name ASC \
                            ) AS BIGINT) AS restaurant_rank \
                     FROM ( \
                         SELECT l.city AS city, r.restaurant_name AS restaurant_name, COUNT(*) AS total_orders \
                         FROM {FACT_ORDERS_TABLE} f \
                         JOIN {DIM_LOCATION_TABLE} l ON f.location_id = l.location_id \
                         JOIN {DIM_RESTAURANT_TABLE} r ON f.restaurant_id = r.restaurant_id \
                         GROUP BY l.city, r.restaurant_name \
                     ) counts \
                 ) ranked \
                 WHERE restaurant_rank <= {RESTAURANTS_PER_CITY} \
                 ORDER BY city, restaurant_rank"
            ),
            Report::TopDishesPerCategory => format!(
                "SELECT category, dish_name, total_orders, dish_rank \
                 FROM ( \
                     SELECT category, dish_name, total_orders, \
                            CAST(RANK() OVER ( \
                                PARTITION BY category ORDER BY total_orders DESC \
                            ) AS BIGINT) AS dish_rank \
                     FROM ( \
                         SELECT c.category AS category, di.dish_name AS dish_name, COUNT(*) AS total_orders \
                         FROM {FACT_ORDERS_TABLE} f \
                         JOIN {DIM_CATEGORY_TABLE} c ON f.category_id = c.category_id \
                         JOIN {DIM_DISH_TABLE} di ON f.dish_id = di.dish_id \
                         GROUP BY c.category, di.dish_name \
                     ) counts \
                 ) ranked \
                 WHERE dish_rank <= {DISHES_PER_CATEGORY} \
                 ORDER BY category, dish_rank, dish_name"
            ),
            Report::RunningMonthlyRevenue => format!(
                "SELECT \"year\", \"month\", monthly_revenue, \
                        SUM(monthly_revenue) OVER ( \
                            ORDER BY \"year\", \"month\" \
                            ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW \
                        ) AS running_revenue \
                 FROM ( \
                     SELECT d.\"year\" AS \"year\", d.\"month\" AS \"month\", \
                            COALESCE(SUM(CAST(f.price AS DOUBLE)), 0.0) AS monthly_revenue \
                     FROM {FACT_ORDERS_TABLE} f JOIN {DIM_DATE_TABLE} d ON f.date_id = d.date_id \
                     GROUP BY d.\"year\", d.\"month\" \
                 ) monthly \
                 ORDER BY \"year\", \"month\""
            ),
        }
    }
}

/// Order count per dimension label, highest first, ties by label.
fn top_by_volume(dimension: &str, key: &str, label: &str, limit: Option<usize>) -> String {
    let limit = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
    format!(
        "SELECT dim.{label} AS {label}, COUNT(*) AS total_orders \
         FROM {FACT_ORDERS_TABLE} f JOIN {dimension} dim ON f.{key} = dim.{key} \
         GROUP BY dim.{label} \
         ORDER BY total_orders DESC, {label} ASC{limit}"
    )
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Report {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Report::ALL
            .iter()
            .copied()
            .find(|report| report.name() == s)
            .ok_or_else(|| Error::UnknownReport(s.to_string()))
    }
}
