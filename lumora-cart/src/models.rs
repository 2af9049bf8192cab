use serde::{Deserialize, Serialize};

use lumora_catalog::ProductOption;
use lumora_core::gateway::CartEcho;

/// One product+option+quantity entry in a cart.
///
/// The option is cached client-side; backend echoes may omit its details,
/// so it is optional here and backfilled on merge. A line without an option,
/// or whose option is out of stock, still renders but never counts toward
/// totals or checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    pub option: Option<ProductOption>,
    pub quantity: u32,
}

impl LineItem {
    /// Effective unit price, 0 when no option data is known.
    pub fn unit_price(&self) -> i64 {
        self.option
            .as_ref()
            .map(ProductOption::effective_unit_price)
            .unwrap_or(0)
    }

    /// Whether this line counts toward totals and checkout.
    pub fn is_purchasable(&self) -> bool {
        self.option.as_ref().is_some_and(ProductOption::in_stock)
    }

    pub fn line_total(&self) -> i64 {
        if self.is_purchasable() {
            self.unit_price() * i64::from(self.quantity)
        } else {
            0
        }
    }
}

/// The session user's cart. Ordered; mutations go through the backend and
/// the local copy is rebuilt from the echoed cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub items: Vec<LineItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn purchasable_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| item.is_purchasable())
    }

    /// Rebuild the cart from a backend echo, backfilling option details the
    /// echo omitted from this cart's cached lines. The echo is authoritative
    /// for membership and quantities; cached data only ever fills gaps.
    pub fn merge_echo(&self, echo: &CartEcho) -> Cart {
        let items = echo
            .items
            .iter()
            .map(|echoed| {
                let cached = self.items.iter().find(|item| {
                    item.product_id == echoed.product_id
                        && match (&echoed.option, &item.option) {
                            (Some(eo), Some(co)) => eo.id == co.id,
                            (None, _) => true,
                            (Some(_), None) => false,
                        }
                });
                let cached_option = cached.and_then(|item| item.option.as_ref());

                let option = match &echoed.option {
                    Some(eo) => Some(ProductOption {
                        id: eo.id.clone(),
                        price: eo
                            .price
                            .or(cached_option.map(|o| o.price))
                            .unwrap_or(0),
                        discount_price: eo
                            .discount_price
                            .or_else(|| cached_option.and_then(|o| o.discount_price)),
                        stock: eo
                            .stock
                            .or(cached_option.map(|o| o.stock))
                            .unwrap_or(0),
                    }),
                    None => cached_option.cloned(),
                };

                LineItem {
                    product_id: echoed.product_id.clone(),
                    product_name: echoed
                        .product_name
                        .clone()
                        .or_else(|| cached.map(|item| item.product_name.clone()))
                        .unwrap_or_default(),
                    option,
                    quantity: echoed.quantity,
                }
            })
            .collect();

        Cart {
            id: echo.id.clone().unwrap_or_else(|| self.id.clone()),
            user_id: self.user_id.clone(),
            items,
        }
    }
}
