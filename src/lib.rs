//! crudboard - admin-panel backend
//!
//! Serves resource listings, record detail views and dashboard cards over a
//! pluggable data store. Resources are declared once at startup; each
//! request resolves records through their field descriptors and resolves
//! cards concurrently.

pub mod api;
pub mod card;
pub mod config;
pub mod context;
pub mod error;
pub mod notification;
pub mod policy;
pub mod query;
pub mod resource;
pub mod store;
