// SPDX-License-Identifier: MIT

//! Services module - business logic and external integrations.

pub mod identity;
pub mod stripe;

pub use identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
pub use stripe::{CheckoutMode, CheckoutSession, StripeClient, StripeEvent};
