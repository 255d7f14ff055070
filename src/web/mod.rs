pub mod admin;
pub mod admin_utils;
pub mod auth;
pub mod data;
pub mod forms;
pub mod landing;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod rate_limit;
pub mod responses;
pub mod router;
pub mod state;
pub mod status;
pub mod storage;
pub mod submissions;
pub mod templates;
#[cfg(test)]
mod test_db;
pub mod tokens;
pub mod uploads;


pub use state::AppState;
pub use templates::{escape_html, render_footer, render_login_page};
