pub mod difficulty;
pub mod params;
pub mod serialization;
pub mod types;
