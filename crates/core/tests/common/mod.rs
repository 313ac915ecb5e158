//! Shared fixtures for storage provider integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use cirrus_core::storage::{
    InMemoryClient, ListPage, ListRequest, ObjectAttributes, ObjectClient, ObjectHead,
    OpendalClient, ProviderOptions, StaticClientFactory, StorageError, StorageProvider, StorageResult,
};
use cirrus_shared::StorageSettings;
use image::{DynamicImage, ImageFormat, RgbImage};
use opendal::{Operator, services};

pub const PUBLIC_URL: &str = "http://x.test/media";

pub type MemoryProvider = StorageProvider<StorageSettings, StaticClientFactory<InMemoryClient>>;
pub type OpendalProvider = StorageProvider<StorageSettings, StaticClientFactory<OpendalClient>>;
pub type FaultyProvider = StorageProvider<StorageSettings, StaticClientFactory<FaultyClient>>;

pub fn settings() -> StorageSettings {
    StorageSettings::memory(PUBLIC_URL)
}

pub fn memory_provider() -> (MemoryProvider, InMemoryClient) {
    memory_provider_with(ProviderOptions::default())
}

pub fn memory_provider_with(options: ProviderOptions) -> (MemoryProvider, InMemoryClient) {
    let client = InMemoryClient::new();
    let provider = StorageProvider::with_options(
        settings(),
        StaticClientFactory::new(client.clone()),
        options,
    );
    (provider, client)
}

/// Provider over an OpenDAL memory operator, which enforces OpenDAL's
/// directory rules.
pub fn opendal_provider() -> (OpendalProvider, OpendalClient) {
    let operator = Operator::new(services::Memory::default()).unwrap().finish();
    let client = OpendalClient::new(operator);
    let provider = StorageProvider::new(settings(), StaticClientFactory::new(client.clone()));
    (provider, client)
}

pub fn faulty_provider_with(options: ProviderOptions) -> (FaultyProvider, FaultyClient) {
    let client = FaultyClient::default();
    let provider = StorageProvider::with_options(
        settings(),
        StaticClientFactory::new(client.clone()),
        options,
    );
    (provider, client)
}

/// Put raw objects straight into the store.
pub async fn seed(client: &InMemoryClient, keys: &[&str]) {
    for key in keys {
        client
            .put_object(key, Bytes::from_static(b"data"), ObjectAttributes::default())
            .await
            .unwrap();
    }
}

/// In-memory store that fails every call while a fault is set.
#[derive(Debug, Clone, Default)]
pub struct FaultyClient {
    pub inner: InMemoryClient,
    fault: Arc<Mutex<Option<StorageError>>>,
}

impl FaultyClient {
    pub fn fail_with(&self, err: StorageError) {
        *self.fault.lock().unwrap() = Some(err);
    }

    pub fn heal(&self) {
        *self.fault.lock().unwrap() = None;
    }

    fn check(&self) -> StorageResult<()> {
        match self.fault.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ObjectClient for FaultyClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        attributes: ObjectAttributes,
    ) -> StorageResult<()> {
        self.check()?;
        self.inner.put_object(key, body, attributes).await
    }

    async fn head_object(&self, key: &str) -> StorageResult<ObjectHead> {
        self.check()?;
        self.inner.head_object(key).await
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.check()?;
        self.inner.get_object(key).await
    }

    async fn list_objects(&self, request: &ListRequest) -> StorageResult<ListPage> {
        self.check()?;
        self.inner.list_objects(request).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.delete_object(key).await
    }

    async fn copy_object(&self, from: &str, to: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.copy_object(from, to).await
    }
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// JPEG carrying an EXIF block whose only field is the orientation.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
    let jpeg = encode_image(width, height, ImageFormat::Jpeg);
    let tiff: [u8; 26] = [
        b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08, //
        0x00, 0x01, //
        0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, //
        0x00, orientation, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00,
    ];
    let length = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}
