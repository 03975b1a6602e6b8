pub mod attendance;
pub mod correction;
pub mod reconcile;
pub mod shift;

#[cfg(test)]
mod tests {
    use actix_web::web::Data;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use crate::config::Config;
    use crate::db::init_db;
    use crate::routes;

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api/v1".into(),
            grace_window_minutes: 15,
            overtime_threshold_minutes: 480,
            rate_protected_per_min: 1000,
        }
    }

    // the rate limiter keys on peer ip, so test requests need one
    fn request(method: test::TestRequest, uri: &str, person: i64, role: &str) -> test::TestRequest {
        method
            .uri(uri)
            .peer_addr("127.0.0.1:9999".parse().unwrap())
            .insert_header(("X-Person-Id", person.to_string()))
            .insert_header(("X-Role", role))
    }

    macro_rules! test_app {
        ($pool:expr, $config:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new($pool.clone()))
                    .app_data(Data::new($config.clone()))
                    .configure(|cfg| routes::configure(cfg, $config.clone())),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_identity_headers_are_unauthorized() {
        let config = test_config();
        let pool = init_db(&config.database_url).await.unwrap();
        let app = test_app!(pool, config);

        let req = test::TestRequest::get()
            .uri("/api/v1/attendance")
            .peer_addr("127.0.0.1:9999".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn check_in_check_out_correction_scenario() {
        let config = test_config();
        let pool = init_db(&config.database_url).await.unwrap();
        let app = test_app!(pool, config);

        // officer checks in at 08:00
        let req = request(test::TestRequest::post(), "/api/v1/attendance/check-in", 1000, "OFFICER")
            .set_json(json!({
                "site_id": 42,
                "division": "SECURITY",
                "time": "2026-03-02T08:00:00",
                "evidence": { "gps_valid": true, "lat": 23.7808, "lng": 90.4217 }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let record: Value = test::read_body_json(resp).await;
        assert_eq!(record["status"], "IN_PROGRESS");
        let record_id = record["id"].as_i64().unwrap();

        // duplicate check-in conflicts with a machine-readable kind
        let req = request(test::TestRequest::post(), "/api/v1/attendance/check-in", 1000, "OFFICER")
            .set_json(json!({ "site_id": 42, "division": "SECURITY", "time": "2026-03-02T09:00:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 409);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "DUPLICATE_OPEN_RECORD");

        // another officer cannot close this record
        let req = request(test::TestRequest::post(), "/api/v1/attendance/check-out", 2000, "OFFICER")
            .set_json(json!({ "record_id": record_id, "time": "2026-03-02T16:00:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        // checkout at 16:00: exactly the standard shift, no overtime
        let req = request(test::TestRequest::post(), "/api/v1/attendance/check-out", 1000, "OFFICER")
            .set_json(json!({ "record_id": record_id, "time": "2026-03-02T16:00:00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let record: Value = test::read_body_json(resp).await;
        assert_eq!(record["status"], "COMPLETED");
        assert_eq!(record["is_overtime"], false);

        // correction: extend the checkout to 18:00
        let req = request(test::TestRequest::post(), "/api/v1/corrections", 7, "SUPERVISOR")
            .set_json(json!({
                "person_id": 1000,
                "site_id": 42,
                "division": "SECURITY",
                "date": "2026-03-02",
                "requested_check_out": "2026-03-02T18:00:00",
                "reason": "extended coverage"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let correction: Value = test::read_body_json(resp).await;
        let correction_id = correction["id"].as_i64().unwrap();

        // officers cannot resolve corrections
        let uri = format!("/api/v1/corrections/{correction_id}/approve");
        let req = request(test::TestRequest::post(), &uri, 1000, "OFFICER").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        // approval applies the correction to the record
        let req = request(test::TestRequest::post(), &uri, 7, "SUPERVISOR").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let correction: Value = test::read_body_json(resp).await;
        assert_eq!(correction["status"], "APPROVED");

        let req = request(
            test::TestRequest::get(),
            "/api/v1/attendance?person_id=1000&date_from=2026-03-02&date_to=2026-03-02",
            7,
            "SUPERVISOR",
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        let page: Value = test::read_body_json(resp).await;
        assert_eq!(page["total"], 1);
        let record = &page["data"][0];
        assert_eq!(record["check_out"], "2026-03-02T18:00:00");
        // 10h worked against an 8h threshold
        assert_eq!(record["is_overtime"], true);

        // the overview counts the overtime
        let req = request(
            test::TestRequest::get(),
            "/api/v1/overview?date=2026-03-02&site_id=42",
            7,
            "SUPERVISOR",
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let overview: Value = test::read_body_json(resp).await;
        let security = overview["divisions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["division"] == "SECURITY")
            .unwrap();
        assert_eq!(security["attendance"]["overtime"], 1);
        assert_eq!(security["attendance"]["total"], 1);

        // replayed approval loses deterministically
        let req = request(test::TestRequest::post(), &uri, 7, "SUPERVISOR").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 409);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "NOT_PENDING");
    }

    #[actix_web::test]
    async fn shift_calendar_round_trip() {
        let config = test_config();
        let pool = init_db(&config.database_url).await.unwrap();
        let app = test_app!(pool, config);

        let req = request(test::TestRequest::post(), "/api/v1/shifts", 7, "SUPERVISOR")
            .set_json(json!({
                "site_id": 42,
                "division": "SECURITY",
                "area": "gate-3",
                "date": "2026-03-02",
                "start_time": "08:00:00",
                "end_time": "16:00:00",
                "person_id": 1000
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let slot: Value = test::read_body_json(resp).await;
        assert_eq!(slot["status"], "ASSIGNED");
        let slot_id = slot["id"].as_i64().unwrap();

        // officers cannot mutate the plan
        let req = request(test::TestRequest::post(), "/api/v1/shifts", 1000, "OFFICER")
            .set_json(json!({
                "site_id": 42,
                "division": "SECURITY",
                "date": "2026-03-02",
                "start_time": "16:00:00",
                "end_time": "22:00:00"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        // vacate, then complete
        let uri = format!("/api/v1/shifts/{slot_id}");
        let req = request(test::TestRequest::patch(), &uri, 7, "SUPERVISOR")
            .set_json(json!({ "vacate": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let slot: Value = test::read_body_json(resp).await;
        assert_eq!(slot["status"], "OPEN");

        let req = request(test::TestRequest::patch(), &uri, 7, "SUPERVISOR")
            .set_json(json!({ "status": "COMPLETED" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let slot: Value = test::read_body_json(resp).await;
        assert_eq!(slot["status"], "COMPLETED");

        let req = request(
            test::TestRequest::get(),
            "/api/v1/shifts/calendar?year=2026&month=3&site_id=42",
            7,
            "SUPERVISOR",
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let grouped: Value = test::read_body_json(resp).await;
        assert_eq!(grouped["2026-03-02"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn kpi_endpoint_parses_kind_and_degrades_to_zero() {
        let config = test_config();
        let pool = init_db(&config.database_url).await.unwrap();
        let app = test_app!(pool, config);

        let req = request(
            test::TestRequest::get(),
            "/api/v1/kpi/patrol?from=2026-03-01&to=2026-03-31",
            7,
            "SUPERVISOR",
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let rate: Value = test::read_body_json(resp).await;
        assert_eq!(rate["rate"], 0.0);
        assert_eq!(rate["denominator"], 0);

        let req = request(
            test::TestRequest::get(),
            "/api/v1/kpi/bogus?from=2026-03-01&to=2026-03-31",
            7,
            "SUPERVISOR",
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "INVALID_FILTER");
    }
}
