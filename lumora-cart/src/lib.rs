pub mod manager;
pub mod models;
pub mod pricing;

pub use manager::{CartError, CartManager};
pub use models::{Cart, LineItem};
pub use pricing::{compute_subtotal, PricingEngine, PricingError, PricingResult};
