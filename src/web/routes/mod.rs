pub mod link_routes;
pub mod tab_routes;
pub mod tag_routes;
pub mod user_routes;
