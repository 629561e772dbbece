//! End-to-end flows through `MeasurementService`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use granite_cache::{CacheCoordinator, MemoryStore, TtlPolicy};
use granite_core::{area, LineItemInput, SheetQuery, SheetStatus, SlabCategory};
use granite_db::{Database, DbConfig, RenumberPolicy};
use measurement_service::{ErrorCode, MeasurementService, ServiceConfig};
use tempfile::TempDir;

async fn memory_service() -> MeasurementService {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let cache = CacheCoordinator::new(Arc::new(MemoryStore::new()), TtlPolicy::default());
    MeasurementService::new(db, cache)
}

async fn file_service() -> (TempDir, MeasurementService) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("ledger.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_secs(30));
    let db = Database::new(config).await.unwrap();
    let cache = CacheCoordinator::new(Arc::new(MemoryStore::new()), TtlPolicy::default());
    (dir, MeasurementService::new(db, cache))
}

fn slab(length: f64, breadth: f64) -> LineItemInput {
    LineItemInput::new(length, breadth, SlabCategory::Polished)
}

#[tokio::test]
async fn concrete_cases_through_calculate() {
    let svc = memory_service().await;

    let cases = [
        (144.0, 144.0, "retail", 144.0, 144.0, 144.0),
        (150.0, 146.0, "granite_shops", 147.0, 144.0, 147.0),
        (149.0, 145.0, "granite_shops", 144.0, 141.0, 141.0),
        (150.0, 100.0, "builders", 147.0, 100.0, 102.08),
        (3.0, 2.0, "exporters", 0.0, 0.0, 0.0),
    ];
    for (l, b, t, fl, fb, a) in cases {
        let r = svc.calculate(l, b, t).unwrap();
        assert_eq!((r.final_length, r.final_breadth, r.area), (fl, fb, a), "{t} {l}x{b}");
    }
}

#[tokio::test]
async fn invalid_calculation_input_is_a_validation_error() {
    let svc = memory_service().await;

    let err = svc.calculate(0.0, 100.0, "retail").unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.violations[0].field(), "length");

    let err = svc.calculate(100.0, 100.0, "unknown").unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn sheet_numbers_are_sequential() {
    let svc = memory_service().await;

    let a = svc.create_sheet("CUST-1", "retail").await.unwrap();
    let b = svc.create_sheet("CUST-2", "builders").await.unwrap();
    assert_eq!(a.sheet_number, "MS-0001");
    assert_eq!(b.sheet_number, "MS-0002");
    assert_eq!(a.status, SheetStatus::Draft);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_yield_serials_one_to_n() {
    let (_dir, svc) = file_service().await;
    let sheet = svc.create_sheet("CUST-7", "granite_shops").await.unwrap();

    const OPERATORS: usize = 20;
    let mut handles = Vec::with_capacity(OPERATORS);
    for n in 0..OPERATORS {
        let svc = svc.clone();
        let sheet_id = sheet.id.clone();
        handles.push(tokio::spawn(async move {
            svc.add_line_item(&sheet_id, slab(120.0 + n as f64, 96.0)).await
        }));
    }

    let mut serials = BTreeSet::new();
    for handle in handles {
        let item = handle.await.unwrap().unwrap();
        assert!(serials.insert(item.serial_number), "duplicate serial");
    }
    assert_eq!(serials, (1..=OPERATORS as i64).collect::<BTreeSet<_>>());

    let full = svc.get_sheet_with_items(&sheet.id).await.unwrap();
    assert_eq!(full.items.len(), OPERATORS);
    assert_eq!(
        full.sheet.total_area,
        area::sum_areas(full.items.iter().map(|i| i.area))
    );
}

#[tokio::test]
async fn batch_gets_consecutive_serials_after_existing_items() {
    let svc = memory_service().await;
    let sheet = svc.create_sheet("CUST-3", "exporters").await.unwrap();

    svc.add_line_item(&sheet.id, slab(100.0, 50.0)).await.unwrap();
    let batch = svc
        .batch_add_line_items(&sheet.id, vec![slab(60.0, 40.0), slab(70.0, 40.0), slab(80.0, 40.0)])
        .await
        .unwrap();

    let serials: Vec<i64> = batch.iter().map(|i| i.serial_number).collect();
    assert_eq!(serials, vec![2, 3, 4]);

    let empty = svc.batch_add_line_items(&sheet.id, Vec::new()).await.unwrap();
    assert!(empty.is_empty());

    let err = svc
        .batch_add_line_items("missing", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn update_keeps_serial_and_refreshes_total() {
    let svc = memory_service().await;
    let sheet = svc.create_sheet("CUST-4", "retail").await.unwrap();

    let first = svc.add_line_item(&sheet.id, slab(144.0, 144.0)).await.unwrap();
    svc.add_line_item(&sheet.id, slab(144.0, 72.0)).await.unwrap();
    assert_eq!(svc.get_sheet(&sheet.id).await.unwrap().total_area, 216.0);

    let updated = svc
        .update_line_item(&first.id, slab(72.0, 72.0).with_block_number("B-12"))
        .await
        .unwrap();
    assert_eq!(updated.serial_number, 1);
    assert_eq!(updated.area, 36.0);
    assert_eq!(updated.block_number.as_deref(), Some("B-12"));
    assert_eq!(svc.get_sheet(&sheet.id).await.unwrap().total_area, 108.0);

    let err = svc
        .update_line_item("missing", slab(10.0, 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_compacts_serials_by_default() {
    let svc = memory_service().await;
    let sheet = svc.create_sheet("CUST-5", "retail").await.unwrap();

    let items = svc
        .batch_add_line_items(&sheet.id, vec![slab(12.0, 12.0), slab(24.0, 12.0), slab(36.0, 12.0)])
        .await
        .unwrap();
    svc.delete_line_item(&items[1].id).await.unwrap();

    let full = svc.get_sheet_with_items(&sheet.id).await.unwrap();
    let serials: Vec<i64> = full.items.iter().map(|i| i.serial_number).collect();
    assert_eq!(serials, vec![1, 2]);
    assert_eq!(full.items[1].id, items[2].id);
    assert_eq!(full.sheet.total_area, 4.0);
}

#[tokio::test]
async fn keep_gaps_then_renumber() {
    let svc = memory_service()
        .await
        .with_delete_policy(RenumberPolicy::KeepGaps);
    let sheet = svc.create_sheet("CUST-6", "retail").await.unwrap();

    let items = svc
        .batch_add_line_items(&sheet.id, vec![slab(12.0, 12.0), slab(12.0, 12.0), slab(12.0, 12.0)])
        .await
        .unwrap();
    svc.delete_line_item(&items[0].id).await.unwrap();

    let next = svc.add_line_item(&sheet.id, slab(12.0, 12.0)).await.unwrap();
    assert_eq!(next.serial_number, 4);

    let moved = svc.renumber_line_items(&sheet.id).await.unwrap();
    assert_eq!(moved, 3);

    let full = svc.get_sheet_with_items(&sheet.id).await.unwrap();
    let serials: Vec<i64> = full.items.iter().map(|i| i.serial_number).collect();
    assert_eq!(serials, vec![1, 2, 3]);
}

#[tokio::test]
async fn completed_sheet_stays_editable() {
    let svc = memory_service().await;
    let sheet = svc.create_sheet("CUST-8", "builders").await.unwrap();

    let completed = svc.complete_sheet(&sheet.id).await.unwrap();
    assert_eq!(completed.status, SheetStatus::Completed);
    let completed_at = completed.completed_at;

    let again = svc.complete_sheet(&sheet.id).await.unwrap();
    assert_eq!(again.completed_at, completed_at);

    let item = svc.add_line_item(&sheet.id, slab(150.0, 100.0)).await.unwrap();
    assert_eq!(item.area, 102.08);
}

#[tokio::test]
async fn listings_and_statistics_follow_mutations() {
    let svc = memory_service().await;
    let query = SheetQuery {
        customer_id: Some("CUST-9".to_string()),
        ..Default::default()
    };

    assert!(svc.search_sheets(&query).await.unwrap().is_empty());
    assert_eq!(svc.sheet_statistics().await.unwrap().total_sheets, 0);

    let sheet = svc.create_sheet("CUST-9", "retail").await.unwrap();
    let listed = svc.search_sheets(&query).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(svc.sheet_statistics().await.unwrap().total_sheets, 1);

    svc.delete_sheet(&sheet.id).await.unwrap();
    assert!(svc.search_sheets(&query).await.unwrap().is_empty());
    assert_eq!(
        svc.get_sheet(&sheet.id).await.unwrap_err().code,
        ErrorCode::NotFound
    );
}

#[tokio::test]
async fn disabled_cache_still_serves() {
    let config = ServiceConfig {
        database_path: ":memory:".to_string(),
        cache_enabled: false,
        ..Default::default()
    };
    let svc = MeasurementService::from_config(&config).await.unwrap();

    let sheet = svc.create_sheet("CUST-10", "retail").await.unwrap();
    svc.add_line_item(&sheet.id, slab(144.0, 144.0)).await.unwrap();
    assert_eq!(svc.get_sheet(&sheet.id).await.unwrap().total_area, 144.0);

    let report = svc.health_check().await;
    assert!(report.database);
    assert_eq!(report.cache_backend, "disabled");
}

#[tokio::test]
async fn customer_change_is_harmless_without_cached_entries() {
    let svc = memory_service().await;
    svc.customer_changed("CUST-11").await;
    svc.customer_changed("CUST-11").await;
}

#[tokio::test]
async fn customer_type_stays_locked_once_items_were_added() {
    let svc = memory_service().await;
    let sheet = svc.create_sheet("CUST-12", "granite_shops").await.unwrap();

    let item = svc.add_line_item(&sheet.id, slab(150.0, 146.0)).await.unwrap();
    assert_eq!(item.area, 147.0);
    svc.delete_line_item(&item.id).await.unwrap();

    let err = svc
        .change_customer_type(&sheet.id, "retail")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);

    let next = svc.add_line_item(&sheet.id, slab(150.0, 146.0)).await.unwrap();
    assert_eq!(next.area, 147.0);
}
