pub mod admin;
pub mod auth;
pub mod master_data;
pub mod movie;
pub mod review;
pub mod users;
