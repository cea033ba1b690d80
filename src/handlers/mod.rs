pub mod auth;
pub mod cities;
pub mod crud;
pub mod dashboard;
pub mod location_costs;
pub mod locations;
pub mod navigation;
pub mod tickets;
pub mod transports;
pub mod users;
pub mod vendors;
