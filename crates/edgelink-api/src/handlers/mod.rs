//! API handlers

pub mod ask;
pub mod documents;
pub mod health;
pub mod home;
