use async_trait::async_trait;
use serde::Serialize;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::rr::RecordType;

/// A domain that resolved to at least one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub domain: String,
    pub cname: Option<String>,
    pub addresses: Vec<String>,
}

/// Outcome of resolving one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolutionResult),
    NoRecords,
    Failed { reason: String },
}

impl Resolution {
    /// Build the outcome for a lookup: an empty address list is `NoRecords`.
    pub fn from_lookup(domain: &str, cname: Option<String>, addresses: Vec<String>) -> Self {
        if addresses.is_empty() {
            return Resolution::NoRecords;
        }

        Resolution::Resolved(ResolutionResult {
            domain: domain.to_string(),
            cname,
            addresses,
        })
    }

    pub fn addresses(&self) -> &[String] {
        match self {
            Resolution::Resolved(result) => &result.addresses,
            _ => &[],
        }
    }
}

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, domain: &str) -> Resolution;
}

/// Resolver backed by the system DNS configuration.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    /// Read the system resolver configuration, falling back to the
    /// library defaults when it cannot be loaded.
    pub fn from_system_conf() -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => {
                tracing::debug!("Using system DNS configuration");
                resolver
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read system DNS config, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };

        Self::new(resolver)
    }

    async fn lookup_addresses(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        let response = self.resolver.ipv4_lookup(domain).await?;
        Ok(response.iter().map(|record| record.0.to_string()).collect())
    }

    async fn lookup_cname(&self, domain: &str) -> Result<Option<String>, ResolveError> {
        match self.resolver.lookup(domain, RecordType::CNAME).await {
            Ok(response) => Ok(response
                .iter()
                .find_map(|rdata| rdata.as_cname())
                .map(|cname| cname.0.to_string())),
            Err(e) if is_no_records(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, domain: &str) -> Resolution {
        let addresses = match self.lookup_addresses(domain).await {
            Ok(addresses) => addresses,
            Err(e) if is_no_records(&e) => {
                tracing::debug!(domain, "no A records");
                return Resolution::NoRecords;
            }
            Err(e) => {
                tracing::debug!(domain, error = %e, "A lookup failed");
                return Resolution::Failed {
                    reason: format!("DNS lookup failed: {}", e),
                };
            }
        };

        // A CNAME query that fails for any reason other than "no records"
        // discards the addresses as well.
        let cname = match self.lookup_cname(domain).await {
            Ok(cname) => cname,
            Err(e) => {
                tracing::debug!(domain, error = %e, "CNAME lookup failed");
                return Resolution::Failed {
                    reason: format!("CNAME lookup failed: {}", e),
                };
            }
        };

        let resolution = Resolution::from_lookup(domain, cname, addresses);
        tracing::debug!(domain, count = resolution.addresses().len(), "resolution complete");
        resolution
    }
}
