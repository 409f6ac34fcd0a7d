pub mod status;

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::domain_resolver::ResolutionResult;
use crate::errors::RunError;
use crate::scanner::ProbeResult;

pub use status::{ConsoleStatus, StatusEvent, StatusSink};

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text blocks, one per domain and banner
    #[default]
    Text,
    /// One JSON object per resolved domain
    Json,
}

/// Separator written after every banner block.
pub fn separator() -> String {
    "-".repeat(50)
}

/// `Domain:` / `CNAME:` / `IP Address(es):` block for a resolved domain.
pub fn domain_block(result: &ResolutionResult) -> String {
    format!(
        "Domain: {}\nCNAME: {}\nIP Address(es): {}\n",
        result.domain,
        result.cname.as_deref().unwrap_or("None"),
        result.addresses.join(", ")
    )
}

pub fn banner_block(probe: &ProbeResult) -> String {
    format!(
        "IP Address: {}\nBanner:\n{}\n{}\n",
        probe.address,
        probe.banner,
        separator()
    )
}

/// JSON line for a domain, filled in while its banners arrive.
#[derive(Debug, Serialize)]
struct DomainRecord {
    #[serde(flatten)]
    resolution: ResolutionResult,
    banners: Vec<ProbeResult>,
}

/// Single writer for the report destination.
///
/// A domain is written as `begin_domain`, any number of `write_banner`,
/// then `end_domain`. Text goes out immediately; JSON is held until the
/// domain ends.
pub struct OutputWriter<W: Write + Send> {
    format: OutputFormat,
    out: W,
    pending: Option<DomainRecord>,
}

impl<W: Write + Send> OutputWriter<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            out,
            pending: None,
        }
    }

    pub fn begin_domain(&mut self, resolution: &ResolutionResult) -> Result<(), RunError> {
        match self.format {
            OutputFormat::Text => {
                self.out.write_all(domain_block(resolution).as_bytes())?;
            }
            OutputFormat::Json => {
                self.pending = Some(DomainRecord {
                    resolution: resolution.clone(),
                    banners: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// Only reportable banners are written.
    pub fn write_banner(&mut self, probe: &ProbeResult) -> Result<(), RunError> {
        if !probe.is_reportable() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => self.out.write_all(banner_block(probe).as_bytes())?,
            OutputFormat::Json => {
                if let Some(record) = self.pending.as_mut() {
                    record.banners.push(probe.clone());
                }
            }
        }
        Ok(())
    }

    pub fn end_domain(&mut self) -> Result<(), RunError> {
        if let Some(record) = self.pending.take() {
            serde_json::to_writer(&mut self.out, &record)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying destination.
    pub fn finish(mut self) -> Result<W, RunError> {
        self.out.flush()?;
        Ok(self.out)
    }
}
