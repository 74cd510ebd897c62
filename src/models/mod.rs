//! Demo models
//!
//! - `basic`: one `users` table with username, email and admin flag
//! - `relational`: users with a 1:1 auth record and 1:N posts

pub mod basic;
pub mod relational;
