//! Extensions bundled with the framework.

pub mod essentials;
