pub mod alerting;
pub mod db;
pub mod notifications;
pub mod server;
pub mod services;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
