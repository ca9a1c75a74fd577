pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod ports;
