use chrono::{DateTime, Duration, Utc};
use shared::ShopItem;

/// Coins charged for one feeding
pub const FEED_COST: i64 = 5;

/// Minimum time between two level-ups
pub fn feed_interval() -> Duration {
    Duration::hours(24)
}

/// (key, label, price)
const CATALOG: &[(&str, &str, i64)] = &[
    ("collar", "Shiny Collar", 10),
    ("scarf", "Cozy Scarf", 15),
    ("hat", "Party Hat", 20),
    ("bowtie", "Bow Tie", 25),
    ("sunglasses", "Cool Sunglasses", 30),
];

pub fn catalog() -> Vec<ShopItem> {
    CATALOG
        .iter()
        .map(|(item, label, price)| ShopItem {
            item: item.to_string(),
            label: label.to_string(),
            price: *price,
        })
        .collect()
}

pub fn catalog_price(item: &str) -> Option<i64> {
    CATALOG
        .iter()
        .find(|(key, _, _)| *key == item)
        .map(|(_, _, price)| *price)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessory {
    pub item: String,
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    pub id: String,
    pub species: String,
    pub name: String,
    pub level: i64,
    pub child_id: String,
    pub last_fed: Option<DateTime<Utc>>,
    pub last_level_up: Option<DateTime<Utc>>,
    pub accessories: Vec<Accessory>,
    pub created_at: DateTime<Utc>,
}

impl Animal {
    /// Whether a feeding at `now` earns a level
    pub fn levels_up_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_level_up {
            None => true,
            Some(last) => now - last >= feed_interval(),
        }
    }

    /// Record a feeding. Returns true when the animal gained a level.
    pub fn feed(&mut self, now: DateTime<Utc>) -> bool {
        let leveled = self.levels_up_at(now);
        if leveled {
            self.level += 1;
            self.last_level_up = Some(now);
        }
        self.last_fed = Some(now);
        leveled
    }

    pub fn owns(&self, item: &str) -> bool {
        self.accessories.iter().any(|a| a.item == item)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnimalValidationError {
    #[error("Pet name must be 1 to 50 characters")]
    InvalidName,
    #[error("Pet type must be 1 to 50 characters")]
    InvalidSpecies,
    #[error("Unknown shop item: {0}")]
    UnknownItem(String),
    #[error("Pet already owns {0}")]
    AlreadyOwned(String),
    #[error("Child already has a pet")]
    AlreadyAdopted,
    #[error("Not enough coins: need {needed}, have {available}")]
    NotEnoughCoins { needed: i64, available: i64 },
}

pub fn validate_label(
    value: &str,
    err: AnimalValidationError,
) -> Result<String, AnimalValidationError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > 50 {
        return Err(err);
    }
    Ok(value.to_string())
}
