//! Gateway checkout and payment verification.

pub mod checkout;
pub mod credentials;
pub mod gateway;
pub mod money;
pub mod razorpay;
pub mod verification;

pub use checkout::{CheckoutOrchestrator, GatewayCheckout};
pub use credentials::{
    resolve_credentials, CredentialSource, EnvCredentialSource, GatewayCredentials, GatewayMode,
    KeyMaterial, KeyPair, StaticCredentialSource,
};
pub use gateway::{CreateGatewayOrder, GatewayFailure, GatewayOrder, PaymentGateway};
pub use razorpay::RazorpayGateway;
pub use verification::{compute_signature, PaymentVerifier, VerifiedPayment, VerifyPayment};
