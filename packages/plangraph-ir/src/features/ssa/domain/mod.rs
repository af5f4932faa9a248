//! SSA domain - versioned name bindings and scope tags

pub mod table;
pub mod tags;

pub use table::VariableTable;
pub use tags::ScopeTags;
