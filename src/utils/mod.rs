pub mod hashtags;
pub mod html;
pub mod jwt;
