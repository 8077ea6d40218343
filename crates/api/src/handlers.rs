pub mod apps;
pub mod audit;
pub mod health;
pub mod permissions;
