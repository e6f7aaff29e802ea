//! Workspace façade crate.
//!
//! Re-exports the download core and its collaborators behind feature flags so
//! a host application can depend on one crate:
//!
//! - `core`: [`download`], [`runtime`] and [`bridge`]
//! - `desktop-shims` (default): `core` plus the [`desktop`] adapters, which are
//!   injected automatically when a collaborator is not provided

#[cfg(feature = "core")]
pub use bridge_traits as bridge;
#[cfg(feature = "core")]
pub use core_download as download;
#[cfg(feature = "core")]
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop as desktop;
