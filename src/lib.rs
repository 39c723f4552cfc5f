pub mod app;
pub mod browse;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod runner;
pub mod selection;
pub mod view;

#[cfg(test)]
mod tests;
