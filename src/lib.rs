//! SM-2 spaced repetition scheduling for vocabulary review, with SQLite
//! persistence, a multi-round review session driver and JSON progress files.

pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use error::{Result, SrsError};
pub use models::{
    Clock, ItemId, Quality, Rating, ReviewSession, ReviewState, Scheduler, Stage, StageCounts,
    UserId, schedule,
};
