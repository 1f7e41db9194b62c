pub mod categories;
pub mod content;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;
