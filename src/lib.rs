pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod scheme;
pub mod services;
pub mod storage;
