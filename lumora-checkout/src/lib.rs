pub mod orchestrator;
pub mod poll;
pub mod validate;

pub use orchestrator::{CheckoutError, CheckoutOrchestrator, CheckoutOutcome, CheckoutState};
pub use poll::{PaymentPoller, PollConfig, PollHandle, PollOutcome};
pub use validate::{CheckoutForm, ShippingAddress, ValidationError};
