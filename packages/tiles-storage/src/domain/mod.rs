//! Domain layer for the section store
//!
//! # Domain Models
//!
//! - `Section`: one stored row (id, number, parent, visibility, pin, label)
//! - `NewSection`: row to insert
//! - `GeneralSectionDisplay`: tri-state marker for section 0
//!
//! # Port Traits
//!
//! - `SectionRepository` / `SectionTransaction`: transactional row access
//! - `Authorizer`: edit permission per course
//! - `CacheInvalidator`: post-commit notification

pub mod models;
pub mod ports;

pub use models::{
    CourseId, GeneralSectionDisplay, NewSection, Section, SectionId, GENERAL_SECTION,
};
pub use ports::{
    AllowAll, Authorizer, CacheInvalidator, NoCache, SectionRepository, SectionTransaction,
};
