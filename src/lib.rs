#![forbid(unsafe_code)]

pub mod application;
pub mod error;
pub mod expansion;
pub mod graphs;
pub mod observer;
pub mod peg;
pub mod record;
pub mod settings;
