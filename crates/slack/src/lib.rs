//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for huddlematch:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Slash Commands** (`commands`) - `/huddle register`, `/huddle list`, `/huddle delete`
//! - **Events** (`events`) - Envelope dispatch to command handlers
//! - **Block Kit** (`blocks`) - Message builders for summaries and match notices
//! - **Huddles** (`huddles`) - The periodic match-and-notify run
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and add the `/huddle` slash command
//! 3. Set env vars: `HUDDLEMATCH_SLACK_APP_TOKEN`, `HUDDLEMATCH_SLACK_BOT_TOKEN`
//!
//! # Key Types
//!
//! - `SocketModeRunner` - WebSocket event loop with reconnection logic
//! - `EventDispatcher` - Routes envelopes to the slash command handler
//! - `SchedulerCommandService` - Command handlers over the availability store
//! - `MatchingOrchestrator` - One timed pass: reap, group, notify

pub mod blocks;
pub mod commands;
pub mod events;
pub mod huddles;
pub mod service;
pub mod socket;
