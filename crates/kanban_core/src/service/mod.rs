//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into transactional use-case APIs.
//! - Keep CLI/request layers decoupled from storage details.

pub mod board_service;
