// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log entries and their conversion into events.
//!
//! [`EventLogger`] is the most common producer of a [`Pusher`]: every entry it logs is echoed
//! through `tracing` and queued as a `"log"` event.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::event::{Event, ToEvent};
use crate::pusher::Pusher;

/// Tag whose value becomes the event's `app_key`.
pub const APP_KEY_TAG: &str = "app-key";
/// Tag whose value becomes the event's `space_id`.
pub const SPACE_ID_TAG: &str = "space-id";
/// Tag whose value becomes the event's `participant_id`.
pub const PARTICIPANT_ID_TAG: &str = "participant-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a level name, or its numeric value. Anything else is `Debug`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "debug" | "0" => Self::Debug,
            "info" | "1" => Self::Info,
            "warning" | "2" => Self::Warning,
            "error" | "3" => Self::Error,
            _ => Self::Debug,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: SystemTime,
    pub level: LogLevel,
    pub message: String,
    pub tags: BTreeMap<String, String>,
    pub error: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time: SystemTime::now(),
            level,
            message: message.into(),
            tags: BTreeMap::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    /// An error entry whose message is the error's own message.
    #[must_use]
    pub fn error(err: &dyn std::error::Error) -> Self {
        let mut entry = Self::new(LogLevel::Error, err.to_string());
        entry.error = err.source().map(ToString::to_string);
        entry
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    fn unix_millis(&self) -> i64 {
        self.time
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    time: String,
    level: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrap: Option<&'a str>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = LogLine {
            time: DateTime::<Utc>::from(self.time).to_rfc3339_opts(SecondsFormat::AutoSi, true),
            level: self.level.as_str(),
            message: &self.message,
            tags: &self.tags,
            wrap: self.error.as_deref(),
        };
        let json = serde_json::to_string(&line).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Wire record of a log event, as the collector expects it.
#[derive(Debug, Default, Serialize)]
pub struct LogEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(rename = "application_identifier", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(rename = "application_product_name", skip_serializing_if = "Option::is_none")]
    pub app_product_name: Option<String>,
    #[serde(rename = "application_version", skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(rename = "auki_sdk_build", skip_serializing_if = "Option::is_none")]
    pub sdk_build: Option<String>,
    #[serde(rename = "auki_sdk_type", skip_serializing_if = "String::is_empty")]
    pub sdk_type: String,
    #[serde(rename = "auki_sdk_version", skip_serializing_if = "String::is_empty")]
    pub sdk_version: String,
    pub data: LogEventData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    pub device_operating_system: &'static str,
    pub device_type: &'static str,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct LogEventData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub log_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl LogEvent {
    #[must_use]
    pub fn from_entry(entry: &LogEntry, sdk_type: &str, sdk_version: &str) -> Self {
        Self {
            app_key: entry.tag(APP_KEY_TAG).map(str::to_string),
            sdk_type: sdk_type.to_string(),
            sdk_version: sdk_version.to_string(),
            data: LogEventData {
                message: entry.to_string(),
                log_type: entry.level.as_str(),
                stacktrace: None,
            },
            device_operating_system: std::env::consts::OS,
            device_type: std::env::consts::ARCH,
            event: "log",
            participant_id: entry.tag(PARTICIPANT_ID_TAG).map(str::to_string),
            space_id: entry.tag(SPACE_ID_TAG).map(str::to_string),
            timestamp: entry.unix_millis(),
            ..Default::default()
        }
    }
}

impl ToEvent for LogEvent {
    fn to_event(&self) -> Event {
        Event::from_serialize(self).unwrap_or_else(|e| {
            error!("Failed to convert log event: {e}");
            Event::default()
        })
    }
}

/// Logs entries locally and forwards them as events.
#[derive(Clone)]
pub struct EventLogger {
    pusher: Pusher,
    sdk_type: String,
    sdk_version_family: String,
}

impl EventLogger {
    #[must_use]
    pub fn new(
        pusher: Pusher,
        sdk_type: impl Into<String>,
        sdk_version_family: impl Into<String>,
    ) -> Self {
        Self {
            pusher,
            sdk_type: sdk_type.into(),
            sdk_version_family: sdk_version_family.into(),
        }
    }

    #[must_use]
    pub fn pusher(&self) -> &Pusher {
        &self.pusher
    }

    pub async fn log(&self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Debug => debug!("{entry}"),
            LogLevel::Info => info!("{entry}"),
            LogLevel::Warning => warn!("{entry}"),
            LogLevel::Error => error!("{entry}"),
        }

        let event = LogEvent::from_entry(entry, &self.sdk_type, &self.sdk_version_family);
        self.pusher.push(event.to_event()).await;
    }
}
