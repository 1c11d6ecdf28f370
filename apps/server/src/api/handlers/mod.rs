//! HTTP request handlers

pub mod course;
pub mod health;
pub mod person;
