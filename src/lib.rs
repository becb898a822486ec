//! Cache-aside shop lookups, distributed locking, sequence ids and flash-sale
//! voucher orders over Redis and Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod infra;
