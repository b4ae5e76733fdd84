//! Shared utility modules used across docseek components.

pub mod varint;
