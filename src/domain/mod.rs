// Domain layer - tank entities and pure presentation rules
pub mod display;
pub mod draft;
pub mod tank;
