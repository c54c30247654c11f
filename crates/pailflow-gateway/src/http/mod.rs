pub mod bots;
pub mod health;
pub mod meet;
pub mod workflows;
