#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod aggregate;
pub mod config;
pub mod data;
pub mod gate;
pub mod pipeline;
pub mod recode;
pub mod resolve;
pub mod types;
pub mod validate;
