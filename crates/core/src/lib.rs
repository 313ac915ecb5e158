//! Object-storage media backend for Cirrus.
//!
//! This crate maps a CMS media library's hierarchical paths onto a flat
//! object-store bucket. It has ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `storage` - Key codec, metadata sidecar, object-store clients and the
//!   storage provider façade
//! - `media` - Upload image pipeline (mime detection, EXIF orientation,
//!   dimensions)

pub mod media;
pub mod storage;
