/// HTTP handlers for dog-service
///
/// - Dogs: fetch a random image for a breed and store it
/// - Health: liveness and Prometheus scrape endpoints
use actix_web::web;

pub mod dogs;
pub mod health;

pub use dogs::get_random_dog_image;
pub use health::{live, metrics};

/// Route pattern of the image endpoint. The breed segment may be empty so
/// that the handler can answer 400 instead of the router answering 404.
pub const DOG_IMAGE_ROUTE: &str = "/dogs/{breed:[^/]*}/image";

/// Register every HTTP route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/live", web::get().to(live))
        .route("/metrics", web::get().to(metrics))
        .service(web::scope("/api/v1").route(DOG_IMAGE_ROUTE, web::get().to(get_random_dog_image)));
}
