pub mod filters;
pub mod grouping;
pub mod models;
pub mod reconcile;
pub mod sources;
