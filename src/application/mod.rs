//! Application services layer.

pub mod articles;
pub mod authoring;
pub mod collaborators;
pub mod curator;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod importer;
pub mod notices;
pub mod profiles;
pub mod render;
