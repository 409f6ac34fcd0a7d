use std::any::Any;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};

use crate::config::RunConfig;
use crate::domain_resolver::{Resolution, ResolutionResult, Resolve};
use crate::errors::RunError;
use crate::output::{OutputWriter, StatusEvent, StatusSink, banner_block, domain_block};
use crate::scanner::{Probe, ProbeResult};

/// What a worker hands to the report writer for one domain.
#[derive(Debug)]
enum WorkerMessage {
    /// Sent as soon as the domain resolves; its probe results follow on
    /// `probes`, which closes once the last address has been probed.
    Resolved {
        resolution: ResolutionResult,
        probes: mpsc::Receiver<ProbeResult>,
    },
    Skipped {
        domain: String,
        resolution: Resolution,
    },
    Failure {
        domain: String,
        message: String,
    },
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub domains: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub banners: usize,
    pub probe_errors: usize,
    pub failures: usize,
}

/// Resolve every domain in the list, probe each address and write the
/// report. Fatal errors are also reported on `status` before returning.
pub async fn run(
    config: &RunConfig,
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    status: Box<dyn StatusSink>,
) -> Result<RunSummary, RunError> {
    let (mut status, result) = pipeline(config, resolver, prober, status).await;

    match &result {
        Ok(summary) => tracing::info!(
            domains = summary.domains,
            resolved = summary.resolved,
            skipped = summary.skipped,
            banners = summary.banners,
            probe_errors = summary.probe_errors,
            failures = summary.failures,
            "run complete"
        ),
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            status.report(StatusEvent::Fatal(e.status_line()));
        }
    }

    result
}

/// Read the domain list, one trimmed entry per line. Blank lines stay in.
pub async fn read_domains(path: &Path) -> Result<Vec<String>, RunError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RunError::InputNotFound(path.to_path_buf()),
            _ => RunError::Input {
                path: path.to_path_buf(),
                source,
            },
        })?;

    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

async fn pipeline(
    config: &RunConfig,
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    status: Box<dyn StatusSink>,
) -> (Box<dyn StatusSink>, Result<RunSummary, RunError>) {
    // The report file exists even when the domain list turns out to be missing.
    let file = match File::create(&config.output) {
        Ok(file) => file,
        Err(source) => {
            let error = RunError::Output {
                path: config.output.clone(),
                source,
            };
            return (status, Err(error));
        }
    };

    let domains = match read_domains(&config.domain_file).await {
        Ok(domains) => domains,
        Err(e) => return (status, Err(e)),
    };

    tracing::info!(
        domains = domains.len(),
        workers = config.pool_size(),
        output = %config.output.display(),
        "starting run"
    );

    let writer = OutputWriter::new(config.format, BufWriter::new(file));
    let (tx, rx) = mpsc::channel(config.pool_size());
    let writer_task = tokio::task::spawn_blocking(move || write_reports(rx, writer, status));

    let semaphore = Arc::new(Semaphore::new(config.pool_size()));
    let mut set = JoinSet::new();
    for domain in domains {
        set.spawn(process_domain(
            domain,
            Arc::clone(&resolver),
            Arc::clone(&prober),
            Arc::clone(&semaphore),
            tx.clone(),
        ));
    }
    drop(tx);

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "domain worker did not finish");
        }
    }

    match writer_task.await {
        Ok(done) => done,
        Err(e) => {
            // The sink went down with the writer thread; fall back to stdout.
            let error = RunError::Write(io::Error::other(join_error_message(e)));
            (Box::new(crate::output::ConsoleStatus), Err(error))
        }
    }
}

/// Holds a pool slot for the resolution and the sequential probes of one domain.
async fn process_domain(
    domain: String,
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    semaphore: Arc<Semaphore>,
    tx: mpsc::Sender<WorkerMessage>,
) {
    let failure = match semaphore.acquire_owned().await {
        Ok(_permit) => {
            let work = tokio::spawn(resolve_and_probe(
                domain.clone(),
                resolver,
                prober,
                tx.clone(),
            ));
            match work.await {
                Ok(()) => return,
                Err(e) => join_error_message(e),
            }
        }
        Err(_) => "worker pool closed".to_string(),
    };

    let message = WorkerMessage::Failure {
        domain: domain.clone(),
        message: failure,
    };
    if tx.send(message).await.is_err() {
        tracing::debug!(domain = %domain, "report writer stopped, dropping result");
    }
}

async fn resolve_and_probe(
    domain: String,
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    tx: mpsc::Sender<WorkerMessage>,
) {
    let resolution = match resolver.resolve(&domain).await {
        Resolution::Resolved(resolution) => resolution,
        resolution => {
            if tx
                .send(WorkerMessage::Skipped { domain, resolution })
                .await
                .is_err()
            {
                tracing::debug!("report writer stopped, dropping result");
            }
            return;
        }
    };

    // Sized so probing never waits on the writer.
    let addresses = resolution.addresses.clone();
    let (probe_tx, probes) = mpsc::channel(addresses.len().max(1));
    if tx
        .send(WorkerMessage::Resolved { resolution, probes })
        .await
        .is_err()
    {
        tracing::debug!(domain = %domain, "report writer stopped, dropping result");
        return;
    }

    for address in &addresses {
        let result = prober.probe_result(address).await;
        if probe_tx.send(result).await.is_err() {
            tracing::debug!(domain = %domain, "writer gave up on domain, stop probing");
            break;
        }
    }
}

/// Consume worker messages in completion order and write them out. A
/// resolved domain is written in one piece: its banners are drained before
/// the next message is taken.
fn write_reports<W: io::Write + Send>(
    mut rx: mpsc::Receiver<WorkerMessage>,
    mut writer: OutputWriter<W>,
    mut status: Box<dyn StatusSink>,
) -> (Box<dyn StatusSink>, Result<RunSummary, RunError>) {
    let mut summary = RunSummary::default();

    while let Some(message) = rx.blocking_recv() {
        summary.domains += 1;
        match message {
            WorkerMessage::Resolved {
                resolution,
                mut probes,
            } => {
                summary.resolved += 1;
                let domain = resolution.domain.clone();
                if let Err(e) =
                    write_domain(&resolution, &mut probes, &mut writer, &mut *status, &mut summary)
                {
                    summary.failures += 1;
                    let message = e.to_string();
                    tracing::warn!(domain = %domain, error = %message, "failed to write domain");
                    status.report(StatusEvent::DomainError { domain, message });
                }
            }
            WorkerMessage::Skipped { domain, resolution } => {
                summary.skipped += 1;
                match resolution {
                    Resolution::Failed { reason } => {
                        tracing::debug!(domain = %domain, reason = %reason, "skipping unresolved domain")
                    }
                    _ => tracing::debug!(domain = %domain, "skipping domain without records"),
                }
            }
            WorkerMessage::Failure { domain, message } => {
                summary.failures += 1;
                tracing::warn!(domain = %domain, error = %message, "domain failed");
                status.report(StatusEvent::DomainError { domain, message });
            }
        }
    }

    let result = writer.finish().map(|_| summary);
    (status, result)
}

/// Write and mirror one domain block followed by its banners as they
/// arrive. Stops at the first write error, dropping the rest of the domain.
fn write_domain<W: io::Write + Send>(
    resolution: &ResolutionResult,
    probes: &mut mpsc::Receiver<ProbeResult>,
    writer: &mut OutputWriter<W>,
    status: &mut dyn StatusSink,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    writer.begin_domain(resolution)?;
    status.report(StatusEvent::Domain(domain_block(resolution)));

    while let Some(probe) = probes.blocking_recv() {
        if !probe.is_reportable() {
            continue;
        }
        writer.write_banner(&probe)?;
        summary.banners += 1;
        if probe.is_error() {
            summary.probe_errors += 1;
        }
        status.report(StatusEvent::Banner(banner_block(&probe)));
    }

    writer.end_domain()
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
