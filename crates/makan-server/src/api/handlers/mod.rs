pub mod health;
pub mod sign;
