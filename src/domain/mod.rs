// Domain layer - Route geometry, vehicles and direction inference rules
pub mod direction;
pub mod error;
pub mod history;
pub mod route;
pub mod spot;
pub mod vehicle;
