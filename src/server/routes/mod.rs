mod categories;
mod pages;
mod users;

pub use categories::category_router;
pub use pages::pages_router;
pub use users::users_router;
