//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod account;
pub mod pagination;
pub mod post;
pub mod validation;

pub use account::{DisplayName, Email, Password};
pub use pagination::{PageParams, Pagination};
pub use post::{PostContent, PostTitle};
pub use validation::ValidationError;
