use std::io::{self, Write};

/// Messages mirrored to the status stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Domain / CNAME / address block, same text as the report.
    Domain(String),
    /// One banner block, same text as the report.
    Banner(String),
    /// A single domain failed; the run carries on.
    DomainError { domain: String, message: String },
    /// The run aborted.
    Fatal(String),
}

impl StatusEvent {
    pub fn render(&self) -> String {
        match self {
            StatusEvent::Domain(block) | StatusEvent::Banner(block) => block.clone(),
            StatusEvent::DomainError { domain, message } => {
                format!("Error processing {}: {}\n", domain, message)
            }
            StatusEvent::Fatal(message) => format!("{}\n", message),
        }
    }
}

pub trait StatusSink: Send {
    fn report(&mut self, event: StatusEvent);
}

/// Status stream on stdout.
#[derive(Debug, Default)]
pub struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn report(&mut self, event: StatusEvent) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout
            .write_all(event.render().as_bytes())
            .and_then(|_| stdout.flush())
        {
            tracing::warn!(error = %e, "failed to write status line");
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that keeps every event for later assertions.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStatus {
        events: Arc<Mutex<Vec<StatusEvent>>>,
    }

    impl MemoryStatus {
        pub fn events(&self) -> Vec<StatusEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn text(&self) -> String {
            self.events().iter().map(StatusEvent::render).collect()
        }
    }

    impl StatusSink for MemoryStatus {
        fn report(&mut self, event: StatusEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
