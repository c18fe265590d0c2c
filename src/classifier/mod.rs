//! Remote image classification: response contract, transport and retrying client.

pub mod client;
pub mod transport;
pub mod types;

pub use client::ClassifierClient;
pub use transport::{ClassifierTransport, HttpTransport, ImageUpload, TransportError, TransportResponse};
pub use types::{Classification, ClassificationResponse, Label};
