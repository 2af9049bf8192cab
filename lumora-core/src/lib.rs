pub mod error;
pub mod gateway;
pub mod phone;
pub mod session;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{CartGateway, OrderGateway, PaymentGateway};
pub use session::{MemorySessionStore, SessionStore};
