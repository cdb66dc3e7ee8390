use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MachineError;

/// The beverages the machine knows how to brew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
    Coffee,
    StrongCoffee,
    Cappuccino,
    CoffeeWithMilk,
    Espresso,
    EspressoChocolate,
    Kakao,
    HotWater,
}

impl Product {
    /// Every supported product, in menu order.
    pub const ALL: [Product; 8] = [
        Product::Coffee,
        Product::StrongCoffee,
        Product::Cappuccino,
        Product::CoffeeWithMilk,
        Product::Espresso,
        Product::EspressoChocolate,
        Product::Kakao,
        Product::HotWater,
    ];

    /// Wire name of the product, as accepted by the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Coffee => "COFFEE",
            Product::StrongCoffee => "STRONG_COFFEE",
            Product::Cappuccino => "CAPPUCCINO",
            Product::CoffeeWithMilk => "COFFEE_WITH_MILK",
            Product::Espresso => "ESPRESSO",
            Product::EspressoChocolate => "ESPRESSO_CHOCOLATE",
            Product::Kakao => "KAKAO",
            Product::HotWater => "HOT_WATER",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Product {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| MachineError::UnsupportedProduct(s.to_string()))
    }
}

/// A single brew request and its timestamp lifecycle.
///
/// `job_started` and `job_ready` are fixed at admission. `job_retrieved` is
/// set exactly once, by a successful retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub product: Product,
    pub job_started: DateTime<Utc>,
    pub job_ready: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_retrieved: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(job_id: String, product: Product, started: DateTime<Utc>, ready: DateTime<Utc>) -> Self {
        Self {
            job_id,
            product,
            job_started: started,
            job_ready: ready,
            job_retrieved: None,
        }
    }

    /// Whether the brew has finished at `now`.
    pub fn is_ready_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.job_ready
    }

    pub fn is_retrieved(&self) -> bool {
        self.job_retrieved.is_some()
    }
}
