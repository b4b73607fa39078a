//! Check-in/check-out reports with per-day mailbox assignment for key pickup.
//!
//! Calendars are read by [`parser`], turned into per-date records and
//! mailbox assignments by [`schedule`], rendered by [`display`] or
//! [`export`], and delivered by [`telegram`].

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod parser;
pub mod schedule;
pub mod telegram;
