//! # folio-entity
//!
//! Domain entity models for Folio. Every struct in this crate represents a
//! database table row or a domain value object. Row types derive
//! `sqlx::FromRow`; enums map to PostgreSQL enum types.

pub mod content;
pub mod folder;
pub mod share;
