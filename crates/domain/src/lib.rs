//! # tripwire-domain
//!
//! Pure domain model for the tripwire event-condition-action dispatcher.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Events** (named, timestamped notifications)
//! - Define **Rules** (trigger → condition → action definitions)
//! - Define the tagged **Trigger**, **Condition** and **Action** variants and
//!   how rule definitions are parsed from their external JSON form
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It never imports anything from `app` or any runtime crate.
//! The dispatcher itself (bus, store, timers, engine) lives in `tripwire-app`.

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod rule;
