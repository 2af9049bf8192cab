use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use lumora_cart::{Cart, PricingResult};
use lumora_core::error::GatewayError;
use lumora_core::gateway::{
    BankPaymentSlip, OrderGateway, OrderReceipt, OrderSubmission, PaymentGateway, PaymentMethod,
    PaymentRequest,
};
use lumora_core::session::{self, keys, SessionStore};

use crate::poll::PollSnapshot;
use crate::validate::{self, CheckoutForm, ValidationError};

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Validating,
    Submitting,
    /// COD order confirmed; the local cart cache is gone. Terminal.
    Finalized { order_id: String },
    /// Bank order confirmed and a payment slip issued; a polling view takes
    /// over from here. Terminal for this orchestrator.
    AwaitingBankPayment {
        order_id: String,
        payment_code: String,
        amount: i64,
    },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    Finalized {
        receipt: OrderReceipt,
    },
    AwaitingBankPayment {
        receipt: OrderReceipt,
        slip: BankPaymentSlip,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a checkout is already in progress")]
    AlreadyInFlight,

    #[error("order submission failed: {0}")]
    Submission(#[source] GatewayError),

    /// The order exists server-side but payment creation failed. The local
    /// cart is deliberately retained so the user can retry the payment.
    #[error("payment setup failed for order {order_id}: {source}")]
    PaymentSetup {
        order_id: String,
        #[source]
        source: GatewayError,
    },
}

/// Drives one checkout attempt: validate, submit, then branch on payment
/// method.
///
/// `Idle -> Validating -> Submitting -> {Finalized | AwaitingBankPayment |
/// Failed}`. Not reentrant — a second `place_order` while one is in flight
/// is rejected up front. The payment-creation call for a bank order is only
/// ever issued after the order-creation response has been received and its
/// id parsed.
pub struct CheckoutOrchestrator {
    orders: Arc<dyn OrderGateway>,
    payments: Arc<dyn PaymentGateway>,
    session: Arc<dyn SessionStore>,
    in_flight: AtomicBool,
    state: Mutex<CheckoutState>,
}

impl CheckoutOrchestrator {
    pub fn new(
        orders: Arc<dyn OrderGateway>,
        payments: Arc<dyn PaymentGateway>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            orders,
            payments,
            session,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(CheckoutState::Idle),
        }
    }

    pub fn state(&self) -> CheckoutState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_state(&self, next: CheckoutState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Stash the checkout form so a reload mid-checkout does not lose it.
    pub fn save_draft(&self, form: &CheckoutForm) {
        session::set_json(self.session.as_ref(), keys::DRAFT_CHECKOUT, form);
    }

    pub fn load_draft(&self) -> Option<CheckoutForm> {
        session::get_json(self.session.as_ref(), keys::DRAFT_CHECKOUT)
    }

    /// Run the whole attempt. Every failure lands in a stable state and is
    /// reported through the returned error; nothing here panics or leaves a
    /// submission half-committed locally.
    pub async fn place_order(
        &self,
        user_id: &str,
        cart: &Cart,
        pricing: &PricingResult,
        form: &CheckoutForm,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(CheckoutError::AlreadyInFlight);
        }

        let result = self.run(user_id, cart, pricing, form).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        user_id: &str,
        cart: &Cart,
        pricing: &PricingResult,
        form: &CheckoutForm,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let attempt = Uuid::new_v4();
        self.set_state(CheckoutState::Validating);

        if let Err(err) = validate::validate(form, cart) {
            self.set_state(CheckoutState::Idle);
            return Err(err.into());
        }

        // validate() guarantees the method is present
        let Some(payment_method) = form.payment_method else {
            self.set_state(CheckoutState::Idle);
            return Err(ValidationError::MissingPaymentMethod.into());
        };

        let submission = OrderSubmission {
            user_id: user_id.to_string(),
            address_line: form.address.address_line.trim().to_string(),
            ward: form.address.ward.trim().to_string(),
            district: form.address.district.trim().to_string(),
            province: form.address.province.trim().to_string(),
            phone: form.phone.trim().to_string(),
            payment_method,
            note: form.note.clone().filter(|n| !n.trim().is_empty()),
            coupon_code: form.coupon_code.clone().filter(|c| !c.trim().is_empty()),
        };

        self.set_state(CheckoutState::Submitting);
        info!(%attempt, ?payment_method, total = pricing.total(), "submitting order");

        let receipt = match self.orders.submit_order(&submission).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%attempt, error = %err, "order submission failed");
                self.set_state(CheckoutState::Failed {
                    message: err.to_string(),
                });
                return Err(CheckoutError::Submission(err));
            }
        };

        match payment_method {
            PaymentMethod::Cod => {
                // order confirmed and nothing left to pay online: the local
                // cart cache and the draft are done
                self.session.remove(keys::CART_CACHE);
                self.session.remove(keys::DRAFT_CHECKOUT);
                self.set_state(CheckoutState::Finalized {
                    order_id: receipt.id.clone(),
                });
                info!(%attempt, order_id = %receipt.id, "order finalized (cod)");
                Ok(CheckoutOutcome::Finalized { receipt })
            }
            PaymentMethod::Bank => {
                self.start_bank_payment(attempt, receipt, pricing.total())
                    .await
            }
        }
    }

    async fn start_bank_payment(
        &self,
        attempt: Uuid,
        receipt: OrderReceipt,
        amount: i64,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let request = PaymentRequest {
            order_id: receipt.id.clone(),
            amount,
        };

        let slip = match self.payments.create_payment(&request).await {
            Ok(slip) => slip,
            Err(err) => {
                // the order exists server-side; keep the cart so the user
                // can retry the payment
                warn!(%attempt, order_id = %receipt.id, error = %err, "payment setup failed");
                self.set_state(CheckoutState::Failed {
                    message: err.to_string(),
                });
                return Err(CheckoutError::PaymentSetup {
                    order_id: receipt.id,
                    source: err,
                });
            }
        };

        session::set_json(
            self.session.as_ref(),
            &keys::payment_snapshot(&slip.payment_code),
            &PollSnapshot::pending(),
        );
        self.session.remove(keys::DRAFT_CHECKOUT);
        self.set_state(CheckoutState::AwaitingBankPayment {
            order_id: receipt.id.clone(),
            payment_code: slip.payment_code.clone(),
            amount: slip.amount,
        });
        info!(
            %attempt,
            order_id = %receipt.id,
            payment_code = %slip.payment_code,
            "awaiting bank payment"
        );
        Ok(CheckoutOutcome::AwaitingBankPayment { receipt, slip })
    }
}
