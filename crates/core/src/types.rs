//! Property record types shared by validation, batch processing and
//! assessment intelligence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single property as supplied by the caller.
///
/// Every field is optional. Computations treat a missing field as
/// insufficient data and skip the record (or the check) instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub id: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub zip_code: Option<String>,
    pub neighborhood: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub square_feet: Option<f64>,
    pub year_built: Option<i32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub lot_size: Option<f64>,
    pub garage_spaces: Option<u32>,
    pub has_pool: Option<bool>,

    /// Current assessed value.
    pub price: Option<f64>,
    pub last_sold_price: Option<f64>,
    pub last_sold_date: Option<NaiveDate>,

    pub property_type: Option<String>,
}

impl PropertyRecord {
    /// Price, when present and strictly positive.
    pub fn positive_price(&self) -> Option<f64> {
        self.price.filter(|p| *p > 0.0)
    }

    /// Square footage, when present and strictly positive.
    pub fn positive_square_feet(&self) -> Option<f64> {
        self.square_feet.filter(|s| *s > 0.0)
    }

    /// `(latitude, longitude)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Price per square foot, requiring both values to be positive.
    pub fn value_per_sq_ft(&self) -> Option<f64> {
        Some(self.positive_price()? / self.positive_square_feet()?)
    }

    /// Whether this record carries the given id.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// Return a copy of this record with every `Some` field of `patch` applied.
    pub fn merged(&self, patch: &PropertyPatch) -> PropertyRecord {
        fn pick<T: Clone>(current: &Option<T>, update: &Option<T>) -> Option<T> {
            update.clone().or_else(|| current.clone())
        }

        PropertyRecord {
            id: pick(&self.id, &patch.id),
            address: pick(&self.address, &patch.address),
            city: pick(&self.city, &patch.city),
            state: pick(&self.state, &patch.state),
            county: pick(&self.county, &patch.county),
            zip_code: pick(&self.zip_code, &patch.zip_code),
            neighborhood: pick(&self.neighborhood, &patch.neighborhood),
            latitude: pick(&self.latitude, &patch.latitude),
            longitude: pick(&self.longitude, &patch.longitude),
            square_feet: pick(&self.square_feet, &patch.square_feet),
            year_built: pick(&self.year_built, &patch.year_built),
            bedrooms: pick(&self.bedrooms, &patch.bedrooms),
            bathrooms: pick(&self.bathrooms, &patch.bathrooms),
            lot_size: pick(&self.lot_size, &patch.lot_size),
            garage_spaces: pick(&self.garage_spaces, &patch.garage_spaces),
            has_pool: pick(&self.has_pool, &patch.has_pool),
            price: pick(&self.price, &patch.price),
            last_sold_price: pick(&self.last_sold_price, &patch.last_sold_price),
            last_sold_date: pick(&self.last_sold_date, &patch.last_sold_date),
            property_type: pick(&self.property_type, &patch.property_type),
        }
    }
}

/// Partial update for [`PropertyRecord::merged`]. `None` leaves the
/// corresponding field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPatch {
    pub id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub zip_code: Option<String>,
    pub neighborhood: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub square_feet: Option<f64>,
    pub year_built: Option<i32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub lot_size: Option<f64>,
    pub garage_spaces: Option<u32>,
    pub has_pool: Option<bool>,
    pub price: Option<f64>,
    pub last_sold_price: Option<f64>,
    pub last_sold_date: Option<NaiveDate>,
    pub property_type: Option<String>,
}
