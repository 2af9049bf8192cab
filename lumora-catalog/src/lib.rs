pub mod coupon;
pub mod option;

pub use coupon::{Coupon, CouponGateway, DiscountType};
pub use option::ProductOption;
