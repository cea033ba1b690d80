pub mod city;
pub mod location;
pub mod location_cost;
pub mod location_cost_detail;
pub mod ride_ticket;
pub mod transport;
pub mod user;
pub mod vendor;
