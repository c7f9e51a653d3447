pub mod ids;
pub mod pagination;
pub mod passwords;
pub mod persistence;
pub mod sessions;
