//! Web access guard
//!
//! Consent itself lives in the user profile; the guard adds the other half
//! of "may we go online": a persisted usage log with a daily request quota,
//! plus the permission-change audit trail.

use crate::storage::JsonDocument;
use crate::utils::time::deserialize_lenient;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Usage history entries kept
pub const MAX_USAGE_HISTORY: usize = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Capability: a last say on whether the web may be used right now
pub trait ConsentGuard: Send + Sync {
    fn can_use_web(&self) -> bool;

    /// Called after every web request attempt
    fn record_usage(&self, _source: &str, _query_type: &str, _subject: Option<&str>, _success: bool) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
    pub source: String,
    pub query_type: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    PermissionGranted,
    PermissionRevoked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionChange {
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<DateTime<Utc>>,
    pub action: PermissionAction,
}

/// Persisted usage log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebUsageLog {
    pub total_requests: u64,
    pub requests_today: u32,
    /// `YYYY-MM-DD` of the last request
    pub last_request_date: Option<String>,
    pub history: VecDeque<UsageEntry>,
    pub permission_changes: Vec<PermissionChange>,
}

impl WebUsageLog {
    fn requests_on(&self, today: NaiveDate) -> u32 {
        let today = today.format(DATE_FORMAT).to_string();
        if self.last_request_date.as_deref() == Some(today.as_str()) {
            self.requests_today
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebUsageStats {
    pub web_enabled: bool,
    pub total_requests: u64,
    pub requests_today: u32,
    pub remaining_today: u32,
    pub last_request_date: Option<String>,
    pub history_count: usize,
}

/// What a front end shows when asking for web consent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionRequest {
    pub needs_permission: bool,
    pub reason: String,
    pub message: &'static str,
    pub benefits: [&'static str; 3],
    pub privacy_note: &'static str,
}

/// Daily-quota guard with a persisted usage log
pub struct WebGuard {
    document: JsonDocument,
    log: Mutex<WebUsageLog>,
    max_daily_requests: u32,
}

impl WebGuard {
    pub fn open(path: impl Into<PathBuf>, max_daily_requests: u32) -> Self {
        let document = JsonDocument::new(path);
        let log: WebUsageLog = document.load();
        Self {
            document,
            log: Mutex::new(log),
            max_daily_requests,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WebUsageLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_daily_requests(&self) -> u32 {
        self.max_daily_requests
    }

    /// Snapshot of the log
    pub fn usage_log(&self) -> WebUsageLog {
        self.lock().clone()
    }

    pub fn remaining_requests(&self) -> u32 {
        self.remaining_requests_on(Local::now().date_naive())
    }

    pub fn remaining_requests_on(&self, today: NaiveDate) -> u32 {
        self.max_daily_requests
            .saturating_sub(self.lock().requests_on(today))
    }

    /// Quota check for `today`; a new day always passes.
    pub fn check_rate_limit_on(&self, today: NaiveDate) -> bool {
        self.lock().requests_on(today) < self.max_daily_requests
    }

    pub fn log_web_usage(&self, source: &str, query_type: &str, subject: Option<&str>, success: bool) {
        self.log_web_usage_at(Local::now().date_naive(), Utc::now(), source, query_type, subject, success);
    }

    /// Count a request against the day's quota and append it to the history
    pub fn log_web_usage_at(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
        source: &str,
        query_type: &str,
        subject: Option<&str>,
        success: bool,
    ) {
        let mut log = self.lock();

        let today = today.format(DATE_FORMAT).to_string();
        if log.last_request_date.as_deref() != Some(today.as_str()) {
            log.requests_today = 0;
            log.last_request_date = Some(today);
        }
        log.total_requests += 1;
        log.requests_today += 1;

        log.history.push_back(UsageEntry {
            timestamp: Some(now),
            source: source.to_string(),
            query_type: query_type.to_string(),
            subject: subject.map(str::to_string),
            success,
        });
        while log.history.len() > MAX_USAGE_HISTORY {
            log.history.pop_front();
        }

        debug!(
            "Web request logged ({} today, {} total)",
            log.requests_today, log.total_requests
        );
        if log.requests_today >= self.max_daily_requests {
            warn!("Daily web quota of {} requests reached", self.max_daily_requests);
        }
        self.document.persist(&*log);
    }

    /// Audit a consent change
    pub fn log_permission_change(&self, granted: bool) {
        let mut log = self.lock();
        let action = if granted {
            PermissionAction::PermissionGranted
        } else {
            PermissionAction::PermissionRevoked
        };
        log.permission_changes.push(PermissionChange {
            timestamp: Some(Utc::now()),
            action,
        });
        info!("Web permission {}", if granted { "granted" } else { "revoked" });
        self.document.persist(&*log);
    }

    pub fn usage_stats(&self, web_enabled: bool) -> WebUsageStats {
        let today = Local::now().date_naive();
        let log = self.lock();
        let requests_today = log.requests_on(today);
        WebUsageStats {
            web_enabled,
            total_requests: log.total_requests,
            requests_today,
            remaining_today: self.max_daily_requests.saturating_sub(requests_today),
            last_request_date: log.last_request_date.clone(),
            history_count: log.history.len(),
        }
    }

    /// Most recent `limit` requests, oldest first
    pub fn recent_usage(&self, limit: usize) -> Vec<UsageEntry> {
        let log = self.lock();
        let skip = log.history.len().saturating_sub(limit);
        log.history.iter().skip(skip).cloned().collect()
    }

    pub fn permission_request(&self, web_enabled: bool, reason: Option<&str>) -> PermissionRequest {
        PermissionRequest {
            needs_permission: !web_enabled,
            reason: reason
                .unwrap_or("Cette fonctionnalité nécessite une recherche en ligne.")
                .to_string(),
            message: "Souhaites-tu autoriser la recherche web pour enrichir les réponses ?",
            benefits: [
                "Données actualisées et vérifiées",
                "Informations factuelles précises",
                "Enrichissement pédagogique",
            ],
            privacy_note: "Les recherches sont anonymes et ne stockent pas de données personnelles.",
        }
    }
}

impl ConsentGuard for WebGuard {
    fn can_use_web(&self) -> bool {
        self.check_rate_limit_on(Local::now().date_naive())
    }

    fn record_usage(&self, source: &str, query_type: &str, subject: Option<&str>, success: bool) {
        self.log_web_usage(source, query_type, subject, success);
    }
}
