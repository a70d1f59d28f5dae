// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod engagement;
pub mod lead;
pub mod prompt;
pub mod transaction;
pub mod user;

pub use engagement::{AccessRecord, FavoriteRecord, UnlockRecord};
pub use lead::Lead;
pub use prompt::Prompt;
pub use transaction::TransactionRecord;
pub use user::User;
