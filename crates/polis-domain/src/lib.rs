//! Polis Domain Layer
//!
//! This crate contains the core business logic and domain model for Polis.
//! It defines the policy aggregate, the rules that are pure functions of it,
//! and the trait interfaces all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **CanonicalPolicy**: one normalized insurance policy, owned by exactly one account
//! - **Natural key**: `(owner, policy_number)`, used to detect re-submitted documents
//! - **Status**: derived from validity dates (current → expiring → expired → superseded)
//! - **Installments / coverage lines**: children only ever written with their policy
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - Only identifier and calendar primitives as dependencies
//! - Pure business logic only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ids;
pub mod installment;
pub mod policy;
pub mod status;
pub mod traits;

// Re-exports for convenience
pub use ids::{OwnerId, PolicyId};
pub use installment::{generate_installments, split_premium, CoverageLine, Installment};
pub use policy::{
    CanonicalPolicy, ExtractionConfidence, PolicyAggregate, PolicyDraft, PolicyFields, StoredPolicy,
    VehicleInfo,
};
pub use status::{derive_status, PolicyStatus};
