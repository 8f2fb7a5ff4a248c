use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channels::{Channel, ChannelTable, ReadingSet};
use crate::models::{Session, SessionRecord};

/// Where the station is in the current session's lifecycle.
///
/// Completion moves `Tracking` straight to `Confirming`; the pending step is
/// not observable. A closed session is handed back to the caller and the
/// machine returns to `AwaitingIdentity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    AwaitingIdentity,
    Tracking,
    Confirming,
    Persisting,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingIdentity => "AwaitingIdentity",
            SessionPhase::Tracking => "Tracking",
            SessionPhase::Confirming => "Confirming",
            SessionPhase::Persisting => "Persisting",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    Repeat,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is active; readings were dropped.
    Ignored,
    Tracked,
    /// First tick of a completion event. Fires once per event.
    CompletionTriggered {
        readings: ReadingSet,
        saturated: Vec<Channel>,
    },
    /// A decision (or its persistence) is outstanding; no new trigger.
    AwaitingDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    Resumed,
    Persist(SessionRecord),
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    channels: ChannelTable,
    phase: SessionPhase,
    session: Option<Session>,
}

impl SessionMachine {
    pub fn new(channels: ChannelTable) -> Self {
        Self {
            channels,
            phase: SessionPhase::AwaitingIdentity,
            session: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn latest_readings(&self) -> ReadingSet {
        self.session
            .as_ref()
            .map(|s| s.latest_readings)
            .unwrap_or_else(|| self.channels.min_readings())
    }

    pub fn begin(&mut self, identity: &str, started_at: DateTime<Utc>) -> Result<&Session> {
        let identity = identity.trim();
        if identity.is_empty() {
            bail!("identity must not be empty");
        }
        if self.phase != SessionPhase::AwaitingIdentity {
            bail!(
                "session already active for {} ({})",
                self.session.as_ref().map(|s| s.identity.as_str()).unwrap_or("?"),
                self.phase.as_str()
            );
        }

        self.phase = SessionPhase::Tracking;
        Ok(self.session.insert(Session {
            id: Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            started_at,
            latest_readings: self.channels.min_readings(),
            completed_readings: None,
            completion_acknowledged: false,
            repeats: 0,
        }))
    }

    /// Feed one tick's readings. Completion is any channel at its maximum;
    /// the acknowledgement flag is set in the same step that leaves
    /// `Tracking`, so later ticks at maximum cannot trigger again.
    pub fn update(&mut self, readings: ReadingSet) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Ignored;
        };
        session.latest_readings = readings;

        if self.phase != SessionPhase::Tracking || session.completion_acknowledged {
            return TickOutcome::AwaitingDecision;
        }

        let saturated = self.channels.saturated(&readings);
        if saturated.is_empty() {
            return TickOutcome::Tracked;
        }

        session.completion_acknowledged = true;
        session.completed_readings = Some(readings);
        self.phase = SessionPhase::Confirming;
        TickOutcome::CompletionTriggered {
            readings,
            saturated,
        }
    }

    pub fn handle_decision(
        &mut self,
        decision: Decision,
        decided_at: DateTime<Utc>,
    ) -> Result<DecisionOutcome> {
        match self.phase {
            SessionPhase::Confirming => {}
            SessionPhase::Persisting => bail!("a save is already in progress"),
            other => bail!("no completion awaiting a decision (phase {})", other.as_str()),
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("confirming without a session"))?;

        match decision {
            Decision::Repeat => {
                session.completion_acknowledged = false;
                session.completed_readings = None;
                session.repeats += 1;
                self.phase = SessionPhase::Tracking;
                Ok(DecisionOutcome::Resumed)
            }
            Decision::Finish => {
                let record = SessionRecord {
                    session_id: session.id.clone(),
                    identity: session.identity.clone(),
                    started_at: session.started_at,
                    recorded_at: decided_at,
                    readings: session
                        .completed_readings
                        .unwrap_or(session.latest_readings),
                };
                self.phase = SessionPhase::Persisting;
                Ok(DecisionOutcome::Persist(record))
            }
        }
    }

    /// The record is durable: close the session and wait for the next user.
    pub fn persistence_succeeded(&mut self) -> Result<Session> {
        if self.phase != SessionPhase::Persisting {
            bail!("no save in progress (phase {})", self.phase.as_str());
        }
        let session = self
            .session
            .take()
            .ok_or_else(|| anyhow!("persisting without a session"))?;
        self.phase = SessionPhase::AwaitingIdentity;
        Ok(session)
    }

    /// Back to `Confirming` with the session untouched so `Finish` can be retried.
    pub fn persistence_failed(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Persisting {
            bail!("no save in progress (phase {})", self.phase.as_str());
        }
        self.phase = SessionPhase::Confirming;
        Ok(())
    }

    /// Drop any active session, e.g. on shutdown.
    pub fn abort(&mut self) -> Option<Session> {
        self.phase = SessionPhase::AwaitingIdentity;
        self.session.take()
    }
}
