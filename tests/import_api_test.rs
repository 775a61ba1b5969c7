// ==========================================
// ImportApi 集成测试
// ==========================================
// 测试目标: 参数优先级、运行台账续跑、reset、启动期错误
// ==========================================


use geo_city_import::api::{ApiError, ImportApi, RunRequest};
use geo_city_import::config::{config_keys, ConfigManager};
use geo_city_import::domain::RunState;
use geo_city_import::importer::NoOpProgressObserver;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::{create_test_db, load_city_tuples, write_city_csv};

fn numbered_csv(count: usize) -> NamedTempFile {
    let rows: Vec<(String, String, String, String)> = (0..count)
        .map(|i| {
            (
                format!("Town {:02}", i),
                "France".to_string(),
                (2000 + i).to_string(),
                format!("45.{},2.{}", i, i),
            )
        })
        .collect();
    let refs: Vec<(&str, &str, &str, &str)> = rows
        .iter()
        .map(|(a, b, c, d)| (a.as_str(), b.as_str(), c.as_str(), d.as_str()))
        .collect();
    write_city_csv(&refs).unwrap()
}

fn quiet_api(db_path: &str) -> ImportApi {
    ImportApi::new(db_path.to_string()).with_observer(Arc::new(NoOpProgressObserver))
}

fn request(source: &NamedTempFile) -> RunRequest {
    let mut req = RunRequest::new(source.path().to_string_lossy().to_string());
    req.throttle_ms = Some(0);
    req.milestone_every = Some(0);
    req
}

#[tokio::test]
async fn test_max_batches_then_resume_from_ledger() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(25);
    let api = quiet_api(&db_path);

    // 第一次: 只处理 2 个批次
    let mut first = request(&csv);
    first.batch_size = Some(5);
    first.max_batches = Some(2);
    let stats = api.run(first).await.unwrap();
    assert_eq!(stats.state, RunState::Completed);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.final_offset, 10);

    let recorded = api
        .last_run(&csv.path().to_string_lossy())
        .unwrap()
        .expect("台账应记录本次运行");
    assert_eq!(recorded.run_id, stats.run_id);
    assert_eq!(recorded.final_offset, 10);

    // 第二次: 从台账位置续跑到末尾
    let mut second = request(&csv);
    second.batch_size = Some(5);
    second.resume = true;
    let stats = api.run(second).await.unwrap();
    assert_eq!(stats.start_offset, 10);
    assert_eq!(stats.final_offset, 25);
    assert_eq!(stats.inserted, 15);

    assert_eq!(load_city_tuples(&db_path).unwrap().len(), 25);
}

#[tokio::test]
async fn test_explicit_start_wins_over_resume() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(10);
    let api = quiet_api(&db_path);

    let mut first = request(&csv);
    first.end_offset = Some(4);
    api.run(first).await.unwrap();

    let mut second = request(&csv);
    second.resume = true;
    second.start_offset = Some(8);
    let stats = api.run(second).await.unwrap();
    assert_eq!(stats.start_offset, 8);
    assert_eq!(stats.inserted, 2);
}

#[tokio::test]
async fn test_resume_without_ledger_starts_at_zero() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(3);
    let api = quiet_api(&db_path);

    let mut req = request(&csv);
    req.resume = true;
    let stats = api.run(req).await.unwrap();
    assert_eq!(stats.start_offset, 0);
    assert_eq!(stats.inserted, 3);
}

#[tokio::test]
async fn test_config_kv_used_when_request_is_silent() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = write_city_csv(&[
        ("Lyon", "France", "500000", "45.76,4.83"),
        ("Annecy", "France", "130000", "45.90,6.12"),
        ("Gap", "France", "40000", "44.56,6.08"),
    ])
    .unwrap();

    let config = ConfigManager::new(&db_path).unwrap();
    config
        .set_config_value(config_keys::MIN_POPULATION, "100000")
        .unwrap();
    config.set_config_value(config_keys::BATCH_SIZE, "2").unwrap();

    let api = quiet_api(&db_path);
    let stats = api.run(request(&csv)).await.unwrap();
    assert_eq!(stats.inserted, 2, "Gap 低于配置中的人口阈值");
    assert_eq!(stats.batches, 2, "批次大小取自 config_kv");

    // 请求字段优先于 config_kv
    let mut req = request(&csv);
    req.min_population = Some(0);
    let stats = api.run(req).await.unwrap();
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn test_malformed_config_value_is_rejected_before_run() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(3);

    ConfigManager::new(&db_path)
        .unwrap()
        .set_config_value(config_keys::BATCH_SIZE, "many")
        .unwrap();

    let result = quiet_api(&db_path).run(request(&csv)).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert!(load_city_tuples(&db_path).unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_clears_existing_rows() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let api = quiet_api(&db_path);

    api.run(request(&numbered_csv(6))).await.unwrap();
    assert_eq!(api.summary().await.unwrap().total_cities, 6);

    let other = write_city_csv(&[("Nantes", "France", "320000", "47.22,-1.55")]).unwrap();
    let mut req = request(&other);
    req.reset = true;
    let stats = api.run(req).await.unwrap();
    assert_eq!(stats.inserted, 1);

    let summary = api.summary().await.unwrap();
    assert_eq!(summary.total_cities, 1);
    assert_eq!(summary.largest_cities[0].name, "Nantes");
}

#[tokio::test]
async fn test_missing_column_is_invalid_input() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(csv, "Name,Population").unwrap();
    writeln!(csv, "Lyon,500000").unwrap();
    csv.flush().unwrap();

    let result = quiet_api(&db_path).run(request(&csv)).await;
    match result {
        Err(ApiError::InvalidInput(msg)) => assert!(msg.contains("Country name EN"), "{}", msg),
        other => panic!("缺列应返回 InvalidInput, 实际: {:?}", other.map(|s| s.state)),
    }
}

#[tokio::test]
async fn test_invalid_range_is_rejected() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(5);

    let mut req = request(&csv);
    req.start_offset = Some(4);
    req.end_offset = Some(2);
    let result = quiet_api(&db_path).run(req).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}

#[tokio::test]
async fn test_stop_requested_before_run_aborts_at_start() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(5);
    let api = quiet_api(&db_path);

    api.stop_handle().request_stop();
    let mut req = request(&csv);
    req.start_offset = Some(2);
    let stats = api.run(req).await.unwrap();

    assert_eq!(stats.state, RunState::Aborted);
    assert_eq!(stats.final_offset, 2);
    assert_eq!(stats.batches, 0);

    let recorded = api.last_run(&csv.path().to_string_lossy()).unwrap().unwrap();
    assert_eq!(recorded.state, RunState::Aborted);
    assert_eq!(recorded.final_offset, 2);
}

#[tokio::test]
async fn test_resume_with_reset_is_rejected_and_keeps_rows() {
    let (_temp_db, db_path) = create_test_db().unwrap();
    let csv = numbered_csv(6);
    let api = quiet_api(&db_path);

    let mut first = request(&csv);
    first.batch_size = Some(2);
    first.max_batches = Some(1);
    let stats = api.run(first).await.unwrap();
    assert_eq!(stats.final_offset, 2);

    let mut second = request(&csv);
    second.resume = true;
    second.reset = true;
    let result = api.run(second).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let names: Vec<String> = load_city_tuples(&db_path)
        .unwrap()
        .into_iter()
        .map(|t| t.0)
        .collect();
    assert_eq!(names, vec!["Town 00".to_string(), "Town 01".to_string()], "已提交的数据不应被清空");
}
