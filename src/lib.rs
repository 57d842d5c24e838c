//! HR Companion - mentor directory and HR community platform
//!
//! This library provides the services, storage and HTTP surface behind the
//! HR Companion server.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod web;
