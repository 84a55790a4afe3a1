use chrono::NaiveDate;
use todosheets::backend::memory::MemoryBackend;
use todosheets::backend::SheetsBackend;
use todosheets::sync::{iso_date, utc_today};
use todosheets::{ListSynchronizer, SyncError, TaskRecord};

const TOKEN: &str = "ya29.test";
const SHEET: &str = "Sheet1";

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn header() -> Vec<String> {
    row(&["Task", "Date Created", "Date Done"])
}

fn march_seventh() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
}

/// Synchronizer over one spreadsheet `list-1` holding `rows` from row 1
fn synchronizer(rows: Vec<Vec<String>>) -> ListSynchronizer<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend.insert_sheet("list-1", "Groceries", SHEET, rows);
    ListSynchronizer::new(backend, SHEET).with_today(march_seventh)
}

fn ids(tasks: &[TaskRecord]) -> Vec<u32> {
    tasks.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn test_list_excludes_completed_rows() {
    let sync = synchronizer(vec![
        header(),
        row(&["Buy milk", "2024-03-01"]),
        row(&["Call plumber", "2024-03-01", "2024-03-02"]),
        row(&["", "2024-03-03"]),
        row(&["Book flights", "2024-03-04", ""]),
        row(&["Renew passport", "2024-03-04", "2024-03-05"]),
    ]);

    let tasks = sync.list(TOKEN, "list-1").await.unwrap();

    assert_eq!(ids(&tasks), vec![2, 4, 5]);
    assert!(tasks.iter().all(|t| t.completed_date.is_empty()));
    assert_eq!(tasks[0].text, "Buy milk");
    assert_eq!(tasks[0].created_date, "2024-03-01");
    assert_eq!(tasks[1].text, "");
}

#[tokio::test]
async fn test_list_keeps_row_ids_across_gaps() {
    let sync = synchronizer(vec![
        header(),
        row(&["First", "2024-03-01"]),
        Vec::new(),
        row(&["Third", "2024-03-01"]),
    ]);

    let tasks = sync.list(TOKEN, "list-1").await.unwrap();
    assert_eq!(ids(&tasks), vec![2, 3, 4]);
    assert_eq!(tasks[1].text, "");
    assert_eq!(tasks[2].text, "Third");
}

#[tokio::test]
async fn test_list_leaves_correct_header_alone() {
    let sync = synchronizer(vec![header(), row(&["Buy milk", "2024-03-01"])]);

    assert!(!sync.ensure_header(TOKEN, "list-1").await.unwrap());
    sync.list(TOKEN, "list-1").await.unwrap();

    let calls = sync.backend().calls();
    assert!(calls.iter().all(|c| !c.starts_with("update")), "{:?}", calls);
}

#[tokio::test]
async fn test_list_repairs_missing_header() {
    let sync = synchronizer(Vec::new());

    let tasks = sync.list(TOKEN, "list-1").await.unwrap();

    assert!(tasks.is_empty());
    assert_eq!(sync.backend().rows("list-1", SHEET).unwrap(), vec![header()]);
}

#[tokio::test]
async fn test_ensure_header_rewrites_mismatch() {
    for first_row in [
        row(&["Task", "Date Created"]),
        row(&["Todo", "Date Created", "Date Done"]),
        row(&["Task", "Created", "Date Done"]),
        row(&["Task", "Date Created", "Finished"]),
    ] {
        let sync = synchronizer(vec![first_row.clone(), row(&["Buy milk", "2024-03-01"])]);

        assert!(sync.ensure_header(TOKEN, "list-1").await.unwrap(), "{:?}", first_row);

        let rows = sync.backend().rows("list-1", SHEET).unwrap();
        assert_eq!(rows[0], header());
        assert_eq!(rows[1], row(&["Buy milk", "2024-03-01"]));
    }
}

#[tokio::test]
async fn test_header_repair_happens_before_reading_rows() {
    let sync = synchronizer(vec![row(&["Stale"]), row(&["Buy milk", "2024-03-01"])]);

    sync.list(TOKEN, "list-1").await.unwrap();

    assert_eq!(
        sync.backend().calls(),
        vec!["get Sheet1!A1:C1", "update Sheet1!A1:C1", "get Sheet1!A2:C"]
    );
}

#[tokio::test]
async fn test_add_then_list() {
    let sync = synchronizer(vec![header(), row(&["Call plumber", "2024-03-01"])]);

    let tasks = sync.add(TOKEN, "list-1", "Buy milk").await.unwrap();

    assert_eq!(
        tasks.last(),
        Some(&TaskRecord {
            id: 3,
            text: "Buy milk".to_string(),
            created_date: "2024-03-07".to_string(),
            completed_date: String::new(),
        })
    );
    assert_eq!(sync.list(TOKEN, "list-1").await.unwrap(), tasks);
}

#[tokio::test]
async fn test_add_uses_current_date_by_default() {
    let backend = MemoryBackend::new();
    backend.insert_sheet("list-1", "Groceries", SHEET, vec![header()]);
    let sync = ListSynchronizer::new(backend, SHEET);

    let tasks = sync.add(TOKEN, "list-1", "Buy milk").await.unwrap();

    let today = iso_date(utc_today());
    assert!(tasks
        .iter()
        .any(|t| t.text == "Buy milk" && t.created_date == today && t.completed_date.is_empty()));
}

#[tokio::test]
async fn test_update_changes_only_text() {
    let sync = synchronizer(vec![
        header(),
        row(&["Buy milk", "2024-03-01"]),
        row(&["Call plumber", "2024-03-02"]),
    ]);

    let tasks = sync.update(TOKEN, "list-1", 3, "Call electrician").await.unwrap();

    assert_eq!(tasks[1].id, 3);
    assert_eq!(tasks[1].text, "Call electrician");
    assert_eq!(tasks[1].created_date, "2024-03-02");
    assert_eq!(tasks[0].text, "Buy milk");
}

#[tokio::test]
async fn test_complete_removes_task() {
    let sync = synchronizer(vec![
        header(),
        row(&["Buy milk", "2024-03-01"]),
        row(&["Call plumber", "2024-03-02"]),
    ]);

    let tasks = sync.complete(TOKEN, "list-1", 2).await.unwrap();
    assert_eq!(ids(&tasks), vec![3]);

    let rows = sync.backend().rows("list-1", SHEET).unwrap();
    assert_eq!(rows[1], row(&["Buy milk", "2024-03-01", "2024-03-07"]));
    assert!(!ids(&sync.list(TOKEN, "list-1").await.unwrap()).contains(&2));
}

#[tokio::test]
async fn test_header_row_is_not_a_task() {
    let sync = synchronizer(vec![header()]);

    let err = sync.complete(TOKEN, "list-1", 1).await.unwrap_err();
    assert!(matches!(err, SyncError::Range { .. }));
    assert!(sync.backend().calls().is_empty());
}

#[tokio::test]
async fn test_create_sheet_writes_header() {
    let sync = ListSynchronizer::new(MemoryBackend::new(), SHEET).with_today(march_seventh);

    let id = sync.create_sheet(TOKEN, "Todo List").await.unwrap();
    assert_eq!(sync.backend().rows(&id, SHEET).unwrap(), vec![header()]);

    let tasks = sync.add(TOKEN, &id, "Buy milk").await.unwrap();
    assert_eq!(ids(&tasks), vec![2]);

    let sheets = sync.list_sheets(TOKEN).await.unwrap();
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].name, "Todo List");
}

#[tokio::test]
async fn test_remote_error_is_surfaced() {
    let sync = synchronizer(vec![header()]);
    sync.backend().fail_next(SyncError::from_status(403, "The caller does not have permission"));

    let err = sync.list(TOKEN, "list-1").await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 403, .. }));
    assert_eq!(err.to_string(), "The caller does not have permission");
}

#[tokio::test]
async fn test_unknown_spreadsheet() {
    let sync = synchronizer(vec![header()]);

    let err = sync.list(TOKEN, "missing").await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 404, .. }));
}

#[tokio::test]
async fn test_append_reports_written_range() {
    let backend = MemoryBackend::new();
    backend.insert_sheet("list-1", "Groceries", SHEET, vec![header(), row(&["Buy milk"])]);

    let range = todosheets::range::parse_range("Sheet1!A:C").unwrap();
    let written = backend
        .append_values(TOKEN, "list-1", &range, vec![row(&["Call plumber", "2024-03-07", ""])])
        .await
        .unwrap();

    assert_eq!(written.to_string(), "Sheet1!A3:C3");
    assert_eq!(written.first_row(), Some(3));
}
