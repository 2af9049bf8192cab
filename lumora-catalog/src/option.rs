use serde::{Deserialize, Serialize};

/// A purchasable variant of a product (size, scent, ...) carrying its own
/// price, discount price and stock level. Amounts are integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: String,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub stock: i64,
}

impl ProductOption {
    /// The price a unit of this option actually sells for: the discount
    /// price when one is set and positive, the list price otherwise.
    /// Malformed data (nothing positive) yields 0 rather than an error.
    pub fn effective_unit_price(&self) -> i64 {
        match self.discount_price {
            Some(discounted) if discounted > 0 => discounted,
            _ => self.price.max(0),
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
