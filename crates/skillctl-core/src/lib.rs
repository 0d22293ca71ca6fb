pub mod config;
pub mod error;
pub mod observability;
pub mod parser;
pub mod path_validation;
pub mod schema;
pub mod skill;
pub mod value;

pub use error::{Result, SkillError};
pub use value::{Mapping, Value};
