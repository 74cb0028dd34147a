pub mod broadcast;
pub mod catalog;
pub mod classifier;
pub mod orchestrator;
pub mod retry;
pub mod upstream;

pub use crate::domain::model::{Movie, MovieInfo, Review};
pub use crate::domain::ports::{ConfigProvider, Entity, Repository};
pub use crate::utils::error::Result;
