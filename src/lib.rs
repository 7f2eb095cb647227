//! Penang Artists - Directory, portfolio and social platform for Penang artists
//!
//! This library provides the core functionality of the platform: artist
//! profiles and moderation, portfolios, events and service listings, the
//! follow graph with its activity feed and notifications, and the HTTP API
//! exposing them.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
