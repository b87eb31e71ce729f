//! # CSI Rust Backend
//!
//! Scheduling cascade engine for construction-project activity schedules.
//!
//! This crate provides a Rust-based backend for the Construction Scheduling
//! Intelligence (CSI) system. Project schedules are lists of activities with
//! start/end dates and workday durations, linked by finish-to-start (FS) and
//! start-to-start (SS) dependencies and evaluated against a workday calendar.
//! Users propose edits (move a start date, change a duration); the backend
//! computes every downstream effect through the dependency graph before
//! anything is committed, so the full blast radius of an edit is reviewable
//! prior to publishing.
//!
//! ## Features
//!
//! - **Workday Calendar**: date arithmetic that skips weekends and holidays
//! - **Cascade Engine**: dependency propagation from direct edits to the
//!   complete set of before/after field changes
//! - **Staging**: a reviewable, disposable ledger of proposed changes per
//!   (user, schedule) pair, recomputed from live state on every edit
//! - **Publish**: commits staged changes to live records with an append-only
//!   audit trail (publish events + per-field change records)
//! - **Status Transitions**: immediate, non-cascading activity status updates
//! - **HTTP API**: RESTful endpoints for frontend integration
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Shared data model and DTO types
//! - [`models`]: The pure computation core (calendar arithmetic, cascade)
//! - [`db`]: Record-store abstraction via the repository pattern
//! - [`services`]: High-level business logic (staging, publish, status)
//! - [`http`]: Axum-based HTTP server and request handlers
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
