// ==========================================
// 仓储层集成测试（文件数据库）
// ==========================================


use chrono::Utc;
use geo_city_import::db::{read_schema_version, CURRENT_SCHEMA_VERSION};
use geo_city_import::domain::{ClassifiedCity, NormalizedCity, Region, RunState, RunStatistics};
use geo_city_import::repository::{CityRepository, CityRepositoryImpl, ImportRunRepository};
use rusqlite::Connection;
use test_helpers::create_test_db;

fn city(name: &str, country: &str, region: Region, population: i64) -> ClassifiedCity {
    ClassifiedCity {
        city: NormalizedCity::new(name, country)
            .with_population(population)
            .with_coordinates(10.0, 20.0),
        region,
    }
}

fn run_stats(run_id: &str, state: RunState, final_offset: usize) -> RunStatistics {
    let now = Utc::now();
    RunStatistics {
        run_id: run_id.to_string(),
        state,
        start_offset: 0,
        end_offset: 100,
        final_offset,
        source_rows: 100,
        batches: final_offset / 10,
        processed: final_offset,
        inserted: final_offset,
        skipped: 0,
        abort_reason: (state == RunState::Aborted).then(|| "写入失败".to_string()),
        started_at: now,
        finished_at: now,
    }
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let (_temp_db, db_path) = create_test_db().unwrap();

    {
        let repo = CityRepositoryImpl::new(&db_path).unwrap();
        let inserted = repo
            .insert_if_absent(vec![
                city("Nairobi", "Kenya", Region::Africa, 4_397_000),
                city("Lagos", "Nigeria", Region::Africa, 8_048_000),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
    }

    let repo = CityRepositoryImpl::new(&db_path).unwrap();
    assert_eq!(repo.count_cities().await.unwrap(), 2);

    // 重新打开后再次写入同一批,不产生新行
    let inserted = repo
        .insert_if_absent(vec![city("Lagos", "Nigeria", Region::Africa, 8_048_000)])
        .await
        .unwrap();
    assert_eq!(inserted, 0);

    let lagos = repo.find_by_name("Lagos").await.unwrap();
    assert_eq!(lagos.len(), 1);
    assert_eq!(lagos[0].region, Region::Africa);
    assert_eq!(lagos[0].population, Some(8_048_000));
}

#[tokio::test]
async fn test_same_name_different_country_are_distinct() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let repo = CityRepositoryImpl::new(&db_path).unwrap();

    let inserted = repo
        .insert_if_absent(vec![
            city("Córdoba", "Spain", Region::Europe, 325_000),
            city("Córdoba", "Argentina", Region::SouthAmerica, 1_330_000),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(repo.find_by_name("Córdoba").await.unwrap().len(), 2);
}

#[test]
fn test_schema_version_recorded() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
}

#[test]
fn test_import_run_ledger_per_source() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let runs = ImportRunRepository::new(&db_path).unwrap();

    assert!(runs.last_run("/data/cities.xlsx").unwrap().is_none());

    runs.record_run("/data/cities.xlsx", &run_stats("run-1", RunState::Aborted, 40))
        .unwrap();
    runs.record_run("/data/cities.xlsx", &run_stats("run-2", RunState::Completed, 100))
        .unwrap();
    runs.record_run("/data/other.csv", &run_stats("run-3", RunState::Completed, 10))
        .unwrap();

    let last = runs.last_run("/data/cities.xlsx").unwrap().unwrap();
    assert_eq!(last.run_id, "run-2");
    assert_eq!(last.final_offset, 100);
    assert!(last.abort_reason.is_none());

    let recent = runs.list_recent(10).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].run_id, "run-3");

    // 中止记录的原因可以读回
    let aborted = recent.iter().find(|r| r.run_id == "run-1").unwrap();
    assert_eq!(aborted.state, RunState::Aborted);
    assert_eq!(aborted.abort_reason.as_deref(), Some("写入失败"));
}
