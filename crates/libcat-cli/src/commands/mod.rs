//! Command handlers

pub mod book;
pub mod card;
pub mod config;
pub mod db;
pub mod loan;
