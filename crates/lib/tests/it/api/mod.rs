mod auth;
mod limits;
