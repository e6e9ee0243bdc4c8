pub mod caption;
pub mod client;

pub use caption::HuggingFaceCaptionClient;
pub use client::HuggingFaceHttpClient;
