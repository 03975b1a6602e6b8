use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use strum::IntoEnumIterator;

use crate::error::ApiError;
use crate::model::attendance::AttendanceRecord;
use crate::model::division::Division;
use crate::model::overview::{
    DivisionAttendanceSnapshot, DivisionOverview, DivisionTaskCompletion, KpiKind, KpiRate,
    ManpowerRow, Overview,
};
use crate::model::shift::ShiftSlot;

// Pure read-side computation: this module joins the three stores and the
// external checklist data but never writes any of them. Missing external
// rows degrade to zeros so dashboards always render.

async fn records_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
    site_id: Option<i64>,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    let mut sql = String::from(
        r#"
        SELECT id, person_id, site_id, division, check_in, check_out, shift,
               is_overtime, is_backup, gps_valid, lat, lng, photo_ref,
               photo_ref IS NOT NULL AS photo_evidence,
               CASE WHEN check_out IS NULL THEN 'IN_PROGRESS' ELSE 'COMPLETED' END AS status,
               correction_id
        FROM attendance
        WHERE date(check_in) = ?
        "#,
    );
    if site_id.is_some() {
        sql.push_str(" AND site_id = ?");
    }

    let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql).bind(date);
    if let Some(site_id) = site_id {
        query = query.bind(site_id);
    }
    Ok(query.fetch_all(pool).await?)
}

async fn assigned_slots_for_date(
    pool: &SqlitePool,
    date: NaiveDate,
    site_id: Option<i64>,
    division: Option<Division>,
) -> Result<Vec<ShiftSlot>, ApiError> {
    let mut sql = String::from(
        r#"
        SELECT id, site_id, division, area, date, start_time, end_time, person_id, status
        FROM shift_slots
        WHERE date = ? AND status = 'ASSIGNED'
        "#,
    );
    if site_id.is_some() {
        sql.push_str(" AND site_id = ?");
    }
    if division.is_some() {
        sql.push_str(" AND division = ?");
    }

    let mut query = sqlx::query_as::<_, ShiftSlot>(&sql).bind(date);
    if let Some(site_id) = site_id {
        query = query.bind(site_id);
    }
    if let Some(division) = division {
        query = query.bind(division);
    }
    Ok(query.fetch_all(pool).await?)
}

/// A record covers a slot only if it started before the slot ended; among
/// candidates the one nearest the scheduled start wins, so split shifts
/// (back-to-back slots for one person) each match their own check-in.
fn slot_has_record(slot: &ShiftSlot, records: &[AttendanceRecord]) -> Option<NaiveDateTime> {
    let person = slot.person_id?;
    let start = NaiveDateTime::new(slot.date, slot.start_time);
    let end = NaiveDateTime::new(slot.date, slot.end_time);
    records
        .iter()
        .filter(|r| {
            r.person_id == person
                && r.site_id == slot.site_id
                && r.division == slot.division
                && r.check_in < end
        })
        .min_by_key(|r| (r.check_in - start).num_seconds().abs())
        .map(|r| r.check_in)
}

/// Per-division join of planned slots against actual records for one day.
/// `now` bounds no-show detection: an unmatched ASSIGNED slot only counts
/// once the slot has ended.
pub async fn compute_overview(
    pool: &SqlitePool,
    date: NaiveDate,
    site_id: Option<i64>,
    grace_window_minutes: i64,
    now: NaiveDateTime,
) -> Result<Overview, ApiError> {
    let records = records_for_date(pool, date, site_id).await?;
    let slots = assigned_slots_for_date(pool, date, site_id, None).await?;

    // external checklist completion per division; absent rows mean zeros
    let mut task_sql = String::from(
        "SELECT division, COUNT(*), COALESCE(SUM(completed), 0) FROM checklist_items WHERE date = ?",
    );
    if site_id.is_some() {
        task_sql.push_str(" AND site_id = ?");
    }
    task_sql.push_str(" GROUP BY division");
    let mut task_q = sqlx::query_as::<_, (String, i64, i64)>(&task_sql).bind(date);
    if let Some(site_id) = site_id {
        task_q = task_q.bind(site_id);
    }
    let task_rows = task_q.fetch_all(pool).await?;

    let grace = Duration::minutes(grace_window_minutes);
    let mut divisions = Vec::new();

    for division in Division::iter() {
        let division_records: Vec<&AttendanceRecord> =
            records.iter().filter(|r| r.division == division).collect();
        let division_slots: Vec<&ShiftSlot> =
            slots.iter().filter(|s| s.division == division).collect();

        let mut late = 0;
        let mut no_show = 0;
        for slot in &division_slots {
            let slot_start = NaiveDateTime::new(date, slot.start_time);
            let slot_end = NaiveDateTime::new(date, slot.end_time);
            match slot_has_record(slot, &records) {
                Some(check_in) => {
                    if check_in > slot_start + grace {
                        late += 1;
                    }
                }
                None => {
                    if now > slot_end {
                        no_show += 1;
                    }
                }
            }
        }

        let attendance = DivisionAttendanceSnapshot {
            on_duty: division_records.len() as i64,
            expected: division_slots.len() as i64,
            late,
            no_show,
            overtime: division_records.iter().filter(|r| r.is_overtime).count() as i64,
            total: division_records.len() as i64,
        };

        let tasks = task_rows
            .iter()
            .find(|(name, _, _)| name.parse::<Division>().map_or(false, |d| d == division))
            .map(|&(_, total, completed)| DivisionTaskCompletion {
                completed,
                total,
                missed: total - completed,
            })
            .unwrap_or_default();

        divisions.push(DivisionOverview {
            division,
            attendance,
            tasks,
        });
    }

    Ok(Overview {
        date,
        site_id,
        divisions,
    })
}

/// Scheduled vs. active headcount grouped by area (site zone or vehicle).
pub async fn compute_manpower(
    pool: &SqlitePool,
    date: NaiveDate,
    site_id: Option<i64>,
    division: Option<Division>,
) -> Result<Vec<ManpowerRow>, ApiError> {
    let slots = assigned_slots_for_date(pool, date, site_id, division).await?;
    let records = records_for_date(pool, date, site_id).await?;

    let mut grouped: BTreeMap<(i64, Option<String>), (i64, i64)> = BTreeMap::new();
    for slot in &slots {
        let entry = grouped
            .entry((slot.site_id, slot.area.clone()))
            .or_insert((0, 0));
        entry.0 += 1;
        if slot_has_record(slot, &records).is_some() {
            entry.1 += 1;
        }
    }

    Ok(grouped
        .into_iter()
        .map(|((site_id, area), (scheduled, active))| ManpowerRow {
            site_id,
            area,
            scheduled_manpower: scheduled,
            active_manpower: active,
        })
        .collect())
}

/// completed / total * 100 over the external checklist rows for the range.
/// A zero denominator yields rate 0, never a fault.
pub async fn compute_kpi(
    pool: &SqlitePool,
    kind: KpiKind,
    from: NaiveDate,
    to: NaiveDate,
    site_id: Option<i64>,
) -> Result<KpiRate, ApiError> {
    if to < from {
        return Err(ApiError::InvalidFilter(
            "end date must not precede start date".into(),
        ));
    }

    let mut sql = String::from(
        "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM checklist_items WHERE kind = ? AND date >= ? AND date <= ?",
    );
    if site_id.is_some() {
        sql.push_str(" AND site_id = ?");
    }

    let mut query = sqlx::query_as::<_, (i64, i64)>(&sql)
        .bind(kind.to_string())
        .bind(from)
        .bind(to);
    if let Some(site_id) = site_id {
        query = query.bind(site_id);
    }
    let (denominator, numerator) = query.fetch_one(pool).await?;

    let rate = if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    };

    Ok(KpiRate {
        kind,
        from,
        to,
        site_id,
        numerator,
        denominator,
        rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::model::attendance::Evidence;
    use crate::store::{attendance, shift};
    use chrono::NaiveTime;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn dt(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        date(day).and_hms_opt(hour, min, 0).unwrap()
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    async fn pool() -> SqlitePool {
        init_db("sqlite::memory:").await.unwrap()
    }

    async fn seed_slot(pool: &SqlitePool, person: Option<i64>, area: &str, start: u32, end: u32) {
        shift::create_slot(
            pool,
            &shift::CreateSlot {
                site_id: 42,
                division: Division::Security,
                area: Some(area.into()),
                date: date(2),
                start_time: time(start),
                end_time: time(end),
                person_id: person,
            },
        )
        .await
        .unwrap();
    }

    async fn seed_checklist(pool: &SqlitePool, kind: &str, day: u32, completed: bool) {
        sqlx::query(
            "INSERT INTO checklist_items (kind, site_id, division, date, completed) VALUES (?, 42, 'SECURITY', ?, ?)",
        )
        .bind(kind)
        .bind(date(day))
        .bind(completed)
        .execute(pool)
        .await
        .unwrap();
    }

    #[actix_web::test]
    async fn overview_counts_late_and_no_show() {
        let pool = pool().await;
        // P: on time. Q: assigned, never showed. R: 20 minutes late.
        seed_slot(&pool, Some(1), "gate-1", 8, 16).await;
        seed_slot(&pool, Some(2), "gate-2", 8, 16).await;
        seed_slot(&pool, Some(3), "gate-3", 8, 16).await;

        let p = attendance::check_in(&pool, 1, 42, Division::Security, dt(2, 8, 5), None, &Evidence::default())
            .await
            .unwrap();
        attendance::check_out(&pool, p.id, dt(2, 16, 0), 480).await.unwrap();
        attendance::check_in(&pool, 3, 42, Division::Security, dt(2, 8, 20), None, &Evidence::default())
            .await
            .unwrap();

        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 16, 30))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();

        assert_eq!(security.attendance.expected, 3);
        assert_eq!(security.attendance.on_duty, 2);
        assert_eq!(security.attendance.late, 1);
        assert_eq!(security.attendance.no_show, 1);

        // other divisions render as zeros, not errors
        let parking = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Parking)
            .unwrap();
        assert_eq!(parking.attendance.expected, 0);
        assert_eq!(parking.tasks.total, 0);
    }

    #[actix_web::test]
    async fn no_show_waits_for_slot_end() {
        let pool = pool().await;
        seed_slot(&pool, Some(2), "gate-2", 8, 16).await;

        // mid-shift: not yet a no-show
        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 12, 0))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();
        assert_eq!(security.attendance.no_show, 0);

        // past slot end: counted
        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 16, 1))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();
        assert_eq!(security.attendance.no_show, 1);
    }

    #[actix_web::test]
    async fn split_shifts_match_records_by_time() {
        let pool = pool().await;
        // one person, back-to-back slots; a single evening check-in must
        // not satisfy the morning slot
        seed_slot(&pool, Some(1), "gate-1", 8, 16).await;
        seed_slot(&pool, Some(1), "gate-1", 16, 22).await;

        attendance::check_in(&pool, 1, 42, Division::Security, dt(2, 16, 30), None, &Evidence::default())
            .await
            .unwrap();

        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 22, 30))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();

        // morning slot: no covering record once it ended
        assert_eq!(security.attendance.no_show, 1);
        // evening slot: matched, 30 minutes past start + grace
        assert_eq!(security.attendance.late, 1);
    }

    #[actix_web::test]
    async fn early_check_in_still_covers_its_slot() {
        let pool = pool().await;
        seed_slot(&pool, Some(1), "gate-1", 8, 16).await;

        attendance::check_in(&pool, 1, 42, Division::Security, dt(2, 7, 30), None, &Evidence::default())
            .await
            .unwrap();

        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 16, 30))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();

        assert_eq!(security.attendance.no_show, 0);
        assert_eq!(security.attendance.late, 0);
    }

    #[actix_web::test]
    async fn overview_aggregates_overtime_and_tasks() {
        let pool = pool().await;
        let p = attendance::check_in(&pool, 1, 42, Division::Security, dt(2, 8, 0), None, &Evidence::default())
            .await
            .unwrap();
        attendance::check_out(&pool, p.id, dt(2, 18, 0), 480).await.unwrap();

        seed_checklist(&pool, "patrol", 2, true).await;
        seed_checklist(&pool, "patrol", 2, false).await;

        let overview = compute_overview(&pool, date(2), Some(42), 15, dt(2, 20, 0))
            .await
            .unwrap();
        let security = overview
            .divisions
            .iter()
            .find(|d| d.division == Division::Security)
            .unwrap();

        assert_eq!(security.attendance.overtime, 1);
        assert_eq!(security.attendance.total, 1);
        assert_eq!(security.tasks.total, 2);
        assert_eq!(security.tasks.completed, 1);
        assert_eq!(security.tasks.missed, 1);
    }

    #[actix_web::test]
    async fn manpower_splits_scheduled_and_active_by_area() {
        let pool = pool().await;
        seed_slot(&pool, Some(1), "gate-1", 8, 16).await;
        seed_slot(&pool, Some(2), "gate-1", 16, 22).await;
        seed_slot(&pool, Some(3), "gate-2", 8, 16).await;
        // open slots are not scheduled manpower
        seed_slot(&pool, None, "gate-2", 16, 22).await;

        attendance::check_in(&pool, 1, 42, Division::Security, dt(2, 8, 0), None, &Evidence::default())
            .await
            .unwrap();

        let rows = compute_manpower(&pool, date(2), Some(42), None).await.unwrap();
        assert_eq!(rows.len(), 2);

        let gate1 = rows.iter().find(|r| r.area.as_deref() == Some("gate-1")).unwrap();
        assert_eq!(gate1.scheduled_manpower, 2);
        assert_eq!(gate1.active_manpower, 1);

        let gate2 = rows.iter().find(|r| r.area.as_deref() == Some("gate-2")).unwrap();
        assert_eq!(gate2.scheduled_manpower, 1);
        assert_eq!(gate2.active_manpower, 0);
    }

    #[actix_web::test]
    async fn kpi_zero_denominator_is_zero_rate() {
        let pool = pool().await;
        let rate = compute_kpi(&pool, KpiKind::Cctv, date(1), date(31), Some(42))
            .await
            .unwrap();
        assert_eq!(rate.denominator, 0);
        assert_eq!(rate.numerator, 0);
        assert_eq!(rate.rate, 0.0);
        assert!(rate.rate.is_finite());
    }

    #[actix_web::test]
    async fn kpi_rate_is_percentage_over_range() {
        let pool = pool().await;
        seed_checklist(&pool, "patrol", 1, true).await;
        seed_checklist(&pool, "patrol", 2, true).await;
        seed_checklist(&pool, "patrol", 3, false).await;
        seed_checklist(&pool, "patrol", 3, true).await;
        // different kind is not counted
        seed_checklist(&pool, "training", 2, false).await;
        // outside the range
        seed_checklist(&pool, "patrol", 9, false).await;

        let rate = compute_kpi(&pool, KpiKind::Patrol, date(1), date(3), Some(42))
            .await
            .unwrap();
        assert_eq!(rate.denominator, 4);
        assert_eq!(rate.numerator, 3);
        assert_eq!(rate.rate, 75.0);

        let err = compute_kpi(&pool, KpiKind::Patrol, date(3), date(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_FILTER");
    }
}
