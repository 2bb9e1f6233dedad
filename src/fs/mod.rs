pub mod backup;
pub mod locking;
