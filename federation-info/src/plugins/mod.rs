//! Plugins exposed by the federation info host.

pub mod federation_info;
