pub mod client;
pub mod gateway;
pub mod models;

pub use client::DashboardClient;
pub use gateway::FetchGateway;
