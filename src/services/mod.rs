//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - The unlock engine and quiz grading are pure functions
//! - Catalog, user, tariff and progression services coordinate repositories
//!   and the cache, validate input and map failures to typed errors
//! - The fixture loader seeds an empty catalog

pub mod catalog;
pub mod fixture;
pub mod progression;
pub mod quiz;
pub mod tariff;
pub mod text;
pub mod unlock;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{CatalogService, CatalogServiceError};
pub use fixture::{CatalogFixture, FixtureLoader, FixtureOutcome, FixtureSummary};
pub use progression::{ProgressionService, ProgressionServiceError};
pub use quiz::{check_video_answer, grade_test, parse_selection, QuizError};
pub use tariff::{TariffService, TariffServiceError};
pub use text::{clean_html, is_valid_email, media_url, normalize_phone};
pub use unlock::{grant, unlock_after, ContentGraph, UnlockError};
pub use user::{UserService, UserServiceError};
