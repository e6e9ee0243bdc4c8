pub mod client;
pub mod prediction;
pub mod types;

pub use client::ReplicateHttpClient;
pub use prediction::ReplicateClient;
