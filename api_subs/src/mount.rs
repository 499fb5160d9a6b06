use actix_web::web::{self};

use crate::routes;

pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::get_current)
        .service(routes::sub::post_change_plan)
        .service(routes::sub::post_cancel)
        .service(routes::sub::post_cancel_scheduled_change)
}

pub fn mount_promo() -> actix_web::Scope {
    web::scope("/promo").service(routes::promo::post_redeem)
}
