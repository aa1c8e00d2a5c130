pub mod kodi;
pub mod store;
pub mod trakt;
