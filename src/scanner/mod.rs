pub mod banner;
pub mod structure;

pub use banner::{BannerProber, Probe};
pub use structure::{ProbeConfig, ProbeResult};
