mod common;

mod routing;
mod schedule;
mod service;
