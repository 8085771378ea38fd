//! # Carecycle Core Library
//!
//! Recurrence engine for the tasks and appointments of a care group: when a
//! recurring item is completed, exactly one next occurrence is created.
//!
//! ## Features
//!
//! - **Typed Rules**: Patterns and end conditions are tagged unions, so a
//!   weekly rule without weekdays or a monthly rule with two forms cannot be
//!   represented
//! - **Pure Scheduling**: Next-date computation is a total function of the
//!   anchor date and the rule
//! - **Idempotent Materialization**: `(parent item, anchor date)` is a unique
//!   key, and rule counters advance through a conditional update
//! - **Decoupled Completion**: Completing an item enqueues an event that a
//!   background consumer processes with retries
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Items, rules and queue records
//! - [`validation`]: Turns submitted rule fields into a typed definition
//! - [`patterns`]: Per-pattern next-candidate evaluators
//! - [`end_condition`]: Series end checks
//! - [`recurrence`]: The scheduler combining patterns and end conditions
//! - [`repository`]: Data access layer with Repository pattern
//! - [`worker`]: Background completion event consumer
//! - [`error`]: Error types with field-level validation detail
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use carecycle_core::{
//!     db,
//!     error::CoreError,
//!     models::{NewItemData, QueueConfig},
//!     repository::{EventRepository, ItemRepository, RuleRepository, SqliteRepository},
//!     validation::{validate, RawRecurrenceRule},
//! };
//! use chrono::{Local, NaiveDate, Utc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("care.db").await?;
//!     let repo = SqliteRepository::new(pool, QueueConfig::default());
//!
//!     let item = repo
//!         .add_item(NewItemData {
//!             title: "Refill prescription".to_string(),
//!             due_date: NaiveDate::from_ymd_opt(2024, 1, 15),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let today = Local::now().date_naive();
//!     let mut raw = RawRecurrenceRule::new(today);
//!     raw.pattern_type = Some("monthly".to_string());
//!     raw.interval_value = Some(1);
//!     raw.day_of_month = Some(15);
//!     raw.end_type = Some("never".to_string());
//!     let definition = validate(&raw).map_err(CoreError::from)?;
//!     repo.attach_rule(item.id, definition).await?;
//!
//!     repo.complete_item(item.id, Utc::now(), today).await?;
//!     let summary = repo.drain_pending_events().await?;
//!     println!("created {} occurrence(s)", summary.created);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod end_condition;
pub mod error;
pub mod models;
pub mod patterns;
pub mod recurrence;
pub mod repository;
pub mod validation;
pub mod worker;
