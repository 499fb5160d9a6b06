use actix_web::web::{self};

use crate::routes;

pub fn mount_tutor() -> actix_web::Scope {
    web::scope("/tutor")
        .service(routes::chat::post_ask)
        .service(routes::chat::get_history)
        .service(routes::chat::delete_history)
}
