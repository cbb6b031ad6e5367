//! # IO Module
//!
//! Interface layer that exposes the domain services over HTTP. Everything
//! here translates between wire DTOs from `shared` and domain types.

pub mod rest;
