use std::time::Duration;

use time::OffsetDateTime;

use crate::config::PersistenceConfig;
use crate::scheduler::{Scheduler, TaskHandle};

use super::{StateProvider, ViewPersistenceRecord};

#[derive(Debug, Clone)]
pub enum PersistenceStatus {
    Disabled,
    Idle {
        last_saved_at: Option<OffsetDateTime>,
    },
    Pending {
        since: OffsetDateTime,
    },
    Error {
        message: String,
        occurred_at: OffsetDateTime,
    },
}

#[derive(Debug, Clone)]
pub enum PersistenceEvent {
    Saved {
        record: ViewPersistenceRecord,
        timestamp: OffsetDateTime,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone)]
struct PersistenceFailure {
    message: String,
    occurred_at: OffsetDateTime,
}

/// Debounced writer for the view-state namespace. Every `save` restarts the
/// quiescence timer and replaces the pending payload.
pub struct PersistenceAdapter {
    provider: Box<dyn StateProvider>,
    namespace: String,
    enabled: bool,
    debounce: Duration,
    timer: Scheduler<ViewPersistenceRecord>,
    pending: Option<TaskHandle>,
    pending_since: Option<OffsetDateTime>,
    last_saved_at: Option<OffsetDateTime>,
    last_error: Option<PersistenceFailure>,
}

impl PersistenceAdapter {
    pub fn new(provider: Box<dyn StateProvider>, config: &PersistenceConfig) -> Self {
        Self {
            provider,
            namespace: config.namespace.clone(),
            enabled: config.enabled,
            debounce: Duration::from_millis(config.debounce_ms),
            timer: Scheduler::new(),
            pending: None,
            pending_since: None,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timer.next_due()
    }

    pub fn status(&self) -> PersistenceStatus {
        if !self.enabled {
            return PersistenceStatus::Disabled;
        }
        if let Some(failure) = &self.last_error {
            return PersistenceStatus::Error {
                message: failure.message.clone(),
                occurred_at: failure.occurred_at,
            };
        }
        if self.pending.is_some() {
            return PersistenceStatus::Pending {
                since: self.pending_since.unwrap_or_else(OffsetDateTime::now_utc),
            };
        }
        PersistenceStatus::Idle {
            last_saved_at: self.last_saved_at,
        }
    }

    /// Reads the namespace. Anything unreadable counts as absent.
    pub fn load(&self) -> Option<ViewPersistenceRecord> {
        if !self.enabled {
            return None;
        }
        let raw = match self.provider.get(&self.namespace) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(?err, namespace = %self.namespace, "failed to read view state");
                return None;
            }
        };
        match ViewPersistenceRecord::from_json(&raw) {
            Ok(record) => {
                tracing::debug!(?record, "restored view state");
                Some(record)
            }
            Err(err) => {
                tracing::warn!(%err, namespace = %self.namespace, "discarding saved view state");
                None
            }
        }
    }

    pub fn save(&mut self, record: ViewPersistenceRecord, now: Duration) {
        if !self.enabled {
            return;
        }
        if let Some(handle) = self.pending.take() {
            self.timer.cancel(handle);
        } else {
            self.pending_since = Some(OffsetDateTime::now_utc());
        }
        self.pending = Some(self.timer.schedule(now, self.debounce, record));
    }

    pub fn poll(&mut self, now: Duration) -> Option<PersistenceEvent> {
        let record = self.timer.drain_due(now).pop()?;
        self.pending = None;
        Some(self.write(record))
    }

    /// Writes the pending payload immediately, ignoring the debounce.
    pub fn flush_now(&mut self) -> Option<PersistenceEvent> {
        let handle = self.pending.take()?;
        let record = self.timer.cancel(handle)?;
        Some(self.write(record))
    }

    /// Drops the pending write without touching storage.
    pub fn cancel(&mut self) -> bool {
        self.pending = None;
        self.pending_since = None;
        self.timer.cancel_all() > 0
    }

    pub fn clear(&mut self) -> anyhow::Result<bool> {
        self.cancel();
        self.provider.remove(&self.namespace)
    }

    fn write(&mut self, record: ViewPersistenceRecord) -> PersistenceEvent {
        self.pending_since = None;
        let timestamp = OffsetDateTime::now_utc();
        let result = record
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| self.provider.set(&self.namespace, &json));
        match result {
            Ok(()) => {
                self.last_saved_at = Some(timestamp);
                self.last_error = None;
                PersistenceEvent::Saved { record, timestamp }
            }
            Err(err) => {
                let message = format!("{err:#}");
                self.last_error = Some(PersistenceFailure {
                    message: message.clone(),
                    occurred_at: timestamp,
                });
                PersistenceEvent::Error { message }
            }
        }
    }
}
