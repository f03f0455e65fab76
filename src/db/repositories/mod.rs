//! Database repositories
//!
//! One repository per aggregate: learners, tariffs, payments, the catalog,
//! quizzes and per-user progress. Each has a trait used by the services and an
//! SQLx implementation covering SQLite and MySQL.

pub mod catalog;
pub mod payment;
pub mod progress;
pub mod quiz;
mod sets;
pub mod tariff;
pub mod user;

pub use catalog::{CatalogRepository, SqlxCatalogRepository};
pub use payment::{PaymentRepository, SqlxPaymentRepository};
pub use progress::{ProgressRepository, SqlxProgressRepository};
pub use quiz::{QuizRepository, SqlxQuizRepository};
pub use tariff::{SqlxTariffRepository, TariffRepository};
pub use user::{SqlxUserRepository, UserRepository};
