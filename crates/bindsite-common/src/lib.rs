pub mod alphafold;
pub mod color;
pub mod error;
pub mod fuzzy;
pub mod identifier;
pub mod index;
pub mod layout;
pub mod model;
