//! Integration tests for the Canopy tree synchronization engine


mod selection;
mod tree_sync;
