pub mod domain;

pub use domain::{DnsResolver, Resolution, ResolutionResult, Resolve};
