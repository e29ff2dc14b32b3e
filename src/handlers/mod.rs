mod assignment_handler;
mod auth_handler;
mod class_handler;
mod notification_handler;
mod peer_review_handler;
mod rubric_handler;
mod submission_handler;
mod user_handler;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    auth_handler::init_routes(cfg);
    user_handler::init_routes(cfg);
    class_handler::init_routes(cfg);
    rubric_handler::init_routes(cfg);
    assignment_handler::init_routes(cfg);
    submission_handler::init_routes(cfg);
    peer_review_handler::init_routes(cfg);
    notification_handler::init_routes(cfg);
}
