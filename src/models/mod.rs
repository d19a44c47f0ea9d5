// Concrete entities: portfolio projects and their images

pub mod image;
pub mod project;

pub use image::{IMAGE_SCHEMA, Image, ImageColumn};
pub use project::{PROJECT_SCHEMA, Project, ProjectColumn, ProjectService};
