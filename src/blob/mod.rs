//! Blob access: resolving stored blob names and minting time-limited
//! shared-access URLs for them.

mod locator;
mod signer;

pub use locator::{ResourceKey, ResourceKind, ResourceLocator, IMAGE_CONTAINER, PLAN_CONTAINER};
pub use signer::{AccessSigner, BlobLocation, Permissions, SharedKeySigner, SignedAccessGrant, SAS_VERSION};
