// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use event_pusher::logs::{EventLogger, LogEntry, APP_KEY_TAG, SPACE_ID_TAG};
use event_pusher::{Pusher, PusherConfig};

const SDK_TYPE: &str = "rust";

#[tokio::main]
pub async fn main() {
    let log_level = env::var("EVENTS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = PusherConfig::from_env();
    if config.endpoint.is_empty() {
        info!("EVENTS_ENDPOINT is not set, events will not be sent");
    }
    debug!("Starting event forwarder with {config:?}");

    let app_key = env::var("EVENTS_APP_KEY").ok();
    let space_id = env::var("EVENTS_SPACE_ID").ok();

    let pusher = Pusher::new(config);
    pusher.start();
    let logger = EventLogger::new(pusher.clone(), SDK_TYPE, sdk_version_family());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let mut entry = LogEntry::info(line);
                    if let Some(app_key) = &app_key {
                        entry = entry.with_tag(APP_KEY_TAG, app_key);
                    }
                    if let Some(space_id) = &space_id {
                        entry = entry.with_tag(SPACE_ID_TAG, space_id);
                    }
                    logger.log(&entry).await;
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {e}");
                    break;
                }
            },
            _ = &mut interrupted => {
                info!("Received interrupt, shutting down");
                break;
            }
        }
    }

    pusher.close().await;
    info!("Event forwarder stopped");
}

/// `major.minor` of this binary's version.
fn sdk_version_family() -> String {
    env!("CARGO_PKG_VERSION")
        .split('.')
        .take(2)
        .collect::<Vec<_>>()
        .join(".")
}
