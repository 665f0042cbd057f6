//! Menu domain module.
//!
//! # Module Structure
//!
//! - `model`: The menu document (`MenuDocument`, `CartaItem`, `DayEntry`)
//! - `dishes`: Textarea ⇄ dish list conversion
//! - `repository`: Repository trait for document persistence

mod dishes;
mod model;
mod repository;

pub use dishes::{join_dishes, normalize_dishes, split_dishes};
pub use model::{CartaItem, DayEntry, MAX_WEEK_DAYS, MenuDocument, PaymentInfo, Weekday};
pub use repository::MenuRepository;
