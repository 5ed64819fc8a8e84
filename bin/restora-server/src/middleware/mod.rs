//! HTTP middleware stack.

pub mod cors;
