use std::{future, pin};

use bytes::Bytes;

#[cfg(not(target_arch = "wasm32"))]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + 'static>>;

/// Fetches the bytes behind a URI, however the implementor likes
/// (filesystem, network, cache). `None` signals absence; the subtree
/// builder turns it into a structural error. Retrying is the implementor's
/// business, never this crate's.
pub trait ResourceResolver {
    fn resolve(&self, uri: &str) -> AsyncReturn<Option<Bytes>>;
}
