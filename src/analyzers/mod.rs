pub mod ages;
pub mod co_changes;
pub mod complexity;
pub mod components;
pub mod hot_spots;
pub mod mass_changes;
