use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

use crate::api::{attendance, correction, reconcile, shift};
use crate::config::Config;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/check-out
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(attendance::patch_attendance)),
                    ),
            )
            .service(
                web::scope("/corrections")
                    // /corrections
                    .service(
                        web::resource("")
                            .route(web::post().to(correction::submit_correction))
                            .route(web::get().to(correction::list_corrections)),
                    )
                    // /corrections/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(correction::get_correction)),
                    )
                    // /corrections/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(correction::approve_correction)),
                    )
                    // /corrections/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::post().to(correction::reject_correction)),
                    ),
            )
            .service(
                web::scope("/shifts")
                    // /shifts
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::create_slot))
                            .route(web::get().to(shift::list_slots)),
                    )
                    // /shifts/calendar (before the {id} matcher)
                    .service(web::resource("/calendar").route(web::get().to(shift::calendar)))
                    // /shifts/{id}
                    .service(web::resource("/{id}").route(web::patch().to(shift::patch_slot))),
            )
            .service(web::resource("/overview").route(web::get().to(reconcile::overview)))
            .service(web::resource("/manpower").route(web::get().to(reconcile::manpower)))
            .service(web::resource("/kpi/{kind}").route(web::get().to(reconcile::kpi))),
    );
}
