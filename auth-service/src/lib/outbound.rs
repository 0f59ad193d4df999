pub mod providers;
pub mod repositories;
