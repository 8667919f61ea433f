// src/models/mod.rs

pub mod notification;
pub mod post;
pub mod user;
pub mod voice;
