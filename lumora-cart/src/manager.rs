use std::sync::Arc;

use tracing::info;

use lumora_catalog::CouponGateway;
use lumora_core::error::GatewayError;
use lumora_core::gateway::{CartEcho, CartGateway, ItemRemoval, QuantityUpdate};
use lumora_core::session::{self, keys, SessionStore};

use crate::models::Cart;
use crate::pricing::{compute_subtotal, PricingEngine, PricingError, PricingResult};

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Owns the local cart and its derived totals, keeping both in sync with
/// backend echoes.
///
/// Mutations delegate to the cart gateway; the local copy only changes
/// after a confirmed success response, so a failed call can never corrupt
/// what the user already had. The last confirmed cart is cached in the
/// session store so a page reload does not start from scratch.
pub struct CartManager {
    gateway: Arc<dyn CartGateway>,
    pricing_engine: PricingEngine,
    session: Arc<dyn SessionStore>,
    user_id: String,
    cart: Cart,
    pricing: PricingResult,
}

impl CartManager {
    pub fn new(
        gateway: Arc<dyn CartGateway>,
        coupons: Arc<dyn CouponGateway>,
        session: Arc<dyn SessionStore>,
        user_id: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        let cart: Cart = session::get_json(session.as_ref(), keys::CART_CACHE)
            .filter(|cached: &Cart| cached.user_id == user_id)
            .unwrap_or(Cart {
                user_id: user_id.clone(),
                ..Cart::default()
            });
        let pricing = PricingResult::from_subtotal(compute_subtotal(&cart));

        Self {
            gateway,
            pricing_engine: PricingEngine::new(coupons),
            session,
            user_id,
            cart,
            pricing,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn pricing(&self) -> &PricingResult {
        &self.pricing
    }

    /// Refresh the cart from the backend.
    pub async fn load(&mut self) -> Result<(), CartError> {
        let echo = self.gateway.fetch_cart(&self.user_id).await?;
        self.commit(&echo);
        Ok(())
    }

    /// Set a line's quantity. Covers both the increase and decrease
    /// affordances; dropping to zero goes through `remove_item` instead.
    pub async fn set_quantity(
        &mut self,
        product_id: &str,
        option_id: &str,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let update = QuantityUpdate {
            user_id: self.user_id.clone(),
            product_id: product_id.to_string(),
            option_id: option_id.to_string(),
            quantity,
        };
        let echo = self.gateway.update_quantity(&update).await?;
        self.commit(&echo);
        Ok(())
    }

    pub async fn remove_item(&mut self, product_id: &str, option_id: &str) -> Result<(), CartError> {
        let removal = ItemRemoval {
            cart_id: self.cart.id.clone(),
            product_id: product_id.to_string(),
            option_id: option_id.to_string(),
        };
        let echo = self.gateway.remove_item(&removal).await?;
        self.commit(&echo);
        Ok(())
    }

    /// Apply a coupon code. Delegates to the pricing engine, which handles
    /// the snapshot/rollback discipline; on success the refreshed cart is
    /// re-cached.
    pub async fn apply_coupon(&mut self, code: &str) -> Result<(), PricingError> {
        self.pricing_engine
            .apply_coupon(&self.user_id, &mut self.cart, &mut self.pricing, code)
            .await?;
        session::set_json(self.session.as_ref(), keys::CART_CACHE, &self.cart);
        Ok(())
    }

    /// Adopt a confirmed backend echo: merge with cached option data,
    /// recompute the subtotal and drop any applied discount (a mutated cart
    /// needs its coupon re-confirmed), then re-cache.
    fn commit(&mut self, echo: &CartEcho) {
        self.cart = self.cart.merge_echo(echo);
        self.pricing = PricingResult::from_subtotal(compute_subtotal(&self.cart));
        session::set_json(self.session.as_ref(), keys::CART_CACHE, &self.cart);
        info!(
            items = self.cart.items.len(),
            subtotal = self.pricing.subtotal,
            "cart synchronized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use async_trait::async_trait;
    use lumora_catalog::{Coupon, ProductOption};
    use lumora_core::error::GatewayResult;
    use lumora_core::gateway::{CouponApplyOutcome, CouponApplyRequest, LineItemEcho, OptionEcho};
    use lumora_core::session::MemorySessionStore;

    struct StubCarts {
        echo: CartEcho,
        fail: bool,
    }

    #[async_trait]
    impl CartGateway for StubCarts {
        async fn fetch_cart(&self, _user_id: &str) -> GatewayResult<CartEcho> {
            self.respond()
        }

        async fn update_quantity(&self, _update: &QuantityUpdate) -> GatewayResult<CartEcho> {
            self.respond()
        }

        async fn remove_item(&self, _removal: &ItemRemoval) -> GatewayResult<CartEcho> {
            self.respond()
        }
    }

    impl StubCarts {
        fn respond(&self) -> GatewayResult<CartEcho> {
            if self.fail {
                Err(GatewayError::Network("unreachable".to_string()))
            } else {
                Ok(self.echo.clone())
            }
        }
    }

    struct NoCoupons;

    #[async_trait]
    impl CouponGateway for NoCoupons {
        async fn apply_coupon(
            &self,
            _request: &CouponApplyRequest,
        ) -> GatewayResult<CouponApplyOutcome> {
            Err(GatewayError::Network("unreachable".to_string()))
        }

        async fn list_coupons(&self) -> GatewayResult<Vec<Coupon>> {
            Ok(vec![])
        }
    }

    fn serum_echo() -> CartEcho {
        CartEcho {
            id: Some("cart-1".to_string()),
            items: vec![LineItemEcho {
                product_id: "p1".to_string(),
                product_name: Some("Rose Serum".to_string()),
                option: Some(OptionEcho {
                    id: "opt-30ml".to_string(),
                    price: Some(200_000),
                    discount_price: Some(150_000),
                    stock: Some(5),
                }),
                quantity: 2,
            }],
        }
    }

    fn manager(carts: StubCarts, session: Arc<MemorySessionStore>) -> CartManager {
        CartManager::new(Arc::new(carts), Arc::new(NoCoupons), session, "user-1")
    }

    #[tokio::test]
    async fn test_load_commits_echo_and_prices_it() {
        let session = Arc::new(MemorySessionStore::new());
        let mut manager = manager(
            StubCarts {
                echo: serum_echo(),
                fail: false,
            },
            session.clone(),
        );

        manager.load().await.unwrap();
        assert_eq!(manager.pricing().subtotal, 300_000);
        assert!(session.get(keys::CART_CACHE).is_some());
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_local_cart_untouched() {
        let session = Arc::new(MemorySessionStore::new());
        let mut manager = manager(
            StubCarts {
                echo: serum_echo(),
                fail: false,
            },
            session.clone(),
        );
        manager.load().await.unwrap();
        let before = manager.cart().clone();

        let mut failing = manager;
        failing.gateway = Arc::new(StubCarts {
            echo: CartEcho::default(),
            fail: true,
        });

        let err = failing.set_quantity("p1", "opt-30ml", 3).await.unwrap_err();
        assert!(matches!(err, CartError::Gateway(_)));
        assert_eq!(failing.cart(), &before);
        assert_eq!(failing.pricing().subtotal, 300_000);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected_without_a_network_call() {
        let session = Arc::new(MemorySessionStore::new());
        let mut manager = manager(
            StubCarts {
                echo: CartEcho::default(),
                fail: true, // any call through the gateway would fail the test
            },
            session,
        );

        let err = manager.set_quantity("p1", "opt-30ml", 0).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(0)));
    }

    #[tokio::test]
    async fn test_new_seeds_from_session_cache_for_same_user() {
        let session = Arc::new(MemorySessionStore::new());
        let cached = Cart {
            id: "cart-1".to_string(),
            user_id: "user-1".to_string(),
            items: vec![LineItem {
                product_id: "p1".to_string(),
                product_name: "Rose Serum".to_string(),
                option: Some(ProductOption {
                    id: "opt-30ml".to_string(),
                    price: 200_000,
                    discount_price: None,
                    stock: 5,
                }),
                quantity: 1,
            }],
        };
        session::set_json(session.as_ref(), keys::CART_CACHE, &cached);

        let manager = manager(
            StubCarts {
                echo: CartEcho::default(),
                fail: true,
            },
            session.clone(),
        );
        assert_eq!(manager.pricing().subtotal, 200_000);

        // another user's session must not inherit the cache
        let other = CartManager::new(
            Arc::new(StubCarts {
                echo: CartEcho::default(),
                fail: true,
            }),
            Arc::new(NoCoupons),
            session,
            "user-2",
        );
        assert!(other.cart().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_drops_previous_discount() {
        let session = Arc::new(MemorySessionStore::new());
        let mut manager = manager(
            StubCarts {
                echo: serum_echo(),
                fail: false,
            },
            session,
        );
        manager.load().await.unwrap();
        manager.pricing.discount = 50_000;

        manager.set_quantity("p1", "opt-30ml", 2).await.unwrap();
        assert_eq!(manager.pricing().discount, 0);
    }
}
