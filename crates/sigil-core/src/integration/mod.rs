//! Integration layer - The surface a platform SDK binding implements.
//!
//! The framework never talks to the network directly. Every fetch, reply and
//! command registration goes through the [`Platform`] trait, so a binding only
//! has to translate these calls to its SDK.

pub mod platform;

pub use platform::{BoxedPlatform, Platform};
