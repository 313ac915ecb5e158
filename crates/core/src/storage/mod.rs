//! Object-storage-backed media file system.
//!
//! Maps the media library's virtual paths (`/photos/2024/a.jpg`) onto flat
//! object keys (`photos/2024/a.jpg`) and synthesizes folders from key
//! prefixes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       StorageProvider                           │
//! │   files, folders, listings, public URLs, upload pipeline        │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │ SettingsSource (per call)    │ ClientCache (per credential set) │
//! ├──────────────────────────────┴──────────────────────────────────┤
//! │                        ObjectClient                             │
//! │   OpendalClient (Aliyun OSS, S3)   │   InMemoryClient           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod key;
pub mod memory;
pub mod operator;
pub mod provider;
pub mod settings;
pub mod sidecar;
pub mod types;
pub mod url;

#[cfg(test)]
mod key_props;
#[cfg(test)]
mod sidecar_props;

pub use cache::{ClientCache, ClientFactory, ClientKey, StaticClientFactory};
pub use client::{ListPage, ListRequest, ObjectAttributes, ObjectClient, ObjectHead, ObjectSummary};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryClient;
pub use operator::{OpendalClient, OperatorFactory};
pub use provider::{ListingOptions, ProviderOptions, StorageProvider};
pub use settings::{SettingsSource, SharedSettings};
pub use sidecar::{DecodeError, Sidecar};
pub use types::{FileWriter, StorageFile, StorageFolder};
