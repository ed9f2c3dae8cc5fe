//! # cardkit testkit
//!
//! Testing utilities for cardkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed cards with their exact snapshot bytes, ids and
//!   self signatures, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a complete in-memory directory with token issuance wired up
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cardkit_testkit::vectors::{all_vectors, model_from_vector};
//!
//! for vector in all_vectors() {
//!     let model = model_from_vector(&vector);
//!     assert_eq!(model.content_snapshot, vector.expected_snapshot.as_bytes());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cardkit_testkit::generators::{snapshot_from_params, CardParams};
//!
//! proptest! {
//!     #[test]
//!     fn snapshot_is_deterministic(params: CardParams) {
//!         prop_assert_eq!(snapshot_from_params(&params), snapshot_from_params(&params));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use cardkit_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let manager = fixture.manager("alice");
//!     let key = fixture.key(1);
//!     manager.publish_card(&key, &key.public_key(), "alice", None, None).await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_keys, TestFixture};
pub use generators::{model_from_params, snapshot_from_params, CardParams};
pub use vectors::{all_vectors, model_from_vector, verify_all_vectors, GoldenVector};
