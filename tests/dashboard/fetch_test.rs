#[path = "../common/mod.rs"]
mod common;

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use common::{sales_model, validate_sql, RecordingTransport};
use panelql::config::Settings;
use panelql::dashboard::{Dashboard, FetchError, FetchOptions, PanelOptions};
use panelql::dialect::Dialect;
use panelql::filter::Filter;
use panelql::model::Value;
use panelql::query::Selection;
use panelql::sql::OrderDirection;
use panelql::transport::{QueryTransport, ResultSet, TransportError, TransportResult};
use serde_json::json;

#[tokio::test]
async fn test_fetch_sends_filtered_query_and_decodes() {
    let m = sales_model();
    let transport = Rc::new(RecordingTransport::new());
    transport.respond(vec![vec![
        vec![json!("Main St"), json!("1200.5")],
        vec![json!("Harbor"), json!(null)],
    ]]);
    let dash = Dashboard::new(m.schema.clone(), transport.clone());
    let table = dash.create_panel(PanelOptions::with_filter(Filter::not_null(&m.store_name)));
    let chart = dash.create_panel(PanelOptions::default());
    chart.filter(vec![Filter::membership(&m.region, ["east", "west"])]);

    let selection = Selection::new()
        .with("store", &m.store_name)
        .with("revenue", &m.revenue);
    let result = table
        .fetch(
            &selection,
            FetchOptions::new().order_by(&m.revenue, OrderDirection::Desc),
        )
        .await
        .unwrap();

    assert_eq!(result.total, None);
    assert_eq!(result.records[0]["store"], Value::from("Main St"));
    assert_eq!(result.records[0]["revenue"], Value::Number(1200.5));
    assert_eq!(result.records[1]["revenue"], Value::Null);

    let batch = transport.last_batch();
    assert_eq!(batch.len(), 1);
    assert_eq!(
        batch[0],
        "SELECT stores.name, sum(sales.amount) \
         FROM (sales INNER JOIN stores ON sales.store_id = stores.id) \
         WHERE (stores.name IS NOT NULL) AND (sales.region IN ('east', 'west')) \
         GROUP BY ALL ORDER BY sum(sales.amount) DESC, stores.name, sum(sales.amount)"
    );
    validate_sql(&batch[0], Dialect::DuckDb).unwrap();
}

#[tokio::test]
async fn test_paged_fetch_uses_configured_staging() {
    let m = sales_model();
    let settings = Settings::from_toml_str(
        r#"
        [query]
        dialect = "postgres"
        staging_table = "dash_page"

        [dashboard]
        page_size = 2
        "#,
    )
    .unwrap();
    let transport = Rc::new(RecordingTransport::new());
    transport.respond(vec![
        vec![],
        vec![],
        vec![vec![json!(5)]],
        vec![vec![json!("east")], vec![json!("west")]],
    ]);
    let dash = Dashboard::with_settings(m.schema.clone(), transport.clone(), &settings);
    let panel = dash.create_panel(PanelOptions::default());

    let page = panel
        .fetch(
            &Selection::new().with("region", &m.region),
            FetchOptions::page(1, dash.page_size()),
        )
        .await
        .unwrap();

    assert_eq!(page.total, Some(5));
    assert_eq!(page.records.len(), 2);

    let batch = transport.last_batch();
    assert_eq!(batch[0], r#"DROP TABLE IF EXISTS "dash_page""#);
    assert!(batch[1].contains("GROUP BY sales.region"), "{}", batch[1]);
    assert!(batch[3].ends_with("LIMIT 2 OFFSET 2"), "{}", batch[3]);
    for sql in &batch {
        validate_sql(sql, Dialect::Postgres).unwrap();
    }
}

#[tokio::test]
async fn test_fetch_failure_is_reported_and_state_kept() {
    let m = sales_model();
    let transport = Rc::new(RecordingTransport::new());
    transport.fail("exit status: 2", "no such table: sales");
    let dash = Dashboard::new(m.schema.clone(), transport.clone());
    let panel = dash.create_panel(PanelOptions::default());
    let calls = Rc::new(Cell::new(0));
    let sink = Rc::clone(&calls);
    panel.on_update(move || sink.set(sink.get() + 1));
    panel.filter(vec![Filter::not_null(&m.region)]);

    let err = panel
        .fetch(&Selection::new().with("region", &m.region), FetchOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "executor failed (exit status: 2): no such table: sales"
    );
    assert!(panel.is_active());
    assert!(!panel.has_pending_update());
    assert_eq!(calls.get(), 1);
    assert_eq!(dash.filters().len(), 1);

    // The next fetch goes through
    let ok = panel
        .fetch(&Selection::new().with("region", &m.region), FetchOptions::new())
        .await
        .unwrap();
    assert!(ok.records.is_empty());
}

#[tokio::test]
async fn test_fetch_decode_error() {
    let m = sales_model();
    let transport = Rc::new(RecordingTransport::new());
    transport.respond(vec![vec![vec![json!({"not": "a number"})]]]);
    let dash = Dashboard::new(m.schema.clone(), transport);
    let panel = dash.create_panel(PanelOptions::default());

    let err = panel
        .fetch(&Selection::new().with("revenue", &m.revenue), FetchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

/// Answers after yielding to the scheduler a per-call number of times.
struct SlowThenFast {
    delays: Vec<usize>,
    calls: Cell<usize>,
}

#[async_trait(?Send)]
impl QueryTransport for SlowThenFast {
    async fn execute(&self, statements: &[String]) -> TransportResult<Vec<ResultSet>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        for _ in 0..self.delays.get(call).copied().unwrap_or(0) {
            tokio::task::yield_now().await;
        }
        if statements.is_empty() {
            return Err(TransportError::ResultCountMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(vec![vec![vec![json!(call as i64)]]])
    }
}

#[tokio::test]
async fn test_superseded_fetch_is_discarded() {
    let m = sales_model();
    let transport = Rc::new(SlowThenFast {
        delays: vec![5, 0],
        calls: Cell::new(0),
    });
    let dash = Dashboard::new(m.schema.clone(), transport);
    let panel = dash.create_panel(PanelOptions::default());
    let selection = Selection::new().with("revenue", &m.revenue);

    let (first, second) = futures::join!(
        panel.fetch_latest(&selection, FetchOptions::new()),
        panel.fetch_latest(&selection, FetchOptions::new()),
    );

    assert_eq!(first.unwrap(), None);
    let second = second.unwrap().unwrap();
    assert_eq!(second.records[0]["revenue"], Value::Number(1.0));

    // Plain fetch never discards
    let (a, b) = futures::join!(
        panel.fetch(&selection, FetchOptions::new()),
        panel.fetch(&selection, FetchOptions::new()),
    );
    assert!(a.is_ok() && b.is_ok());
}

#[cfg(unix)]
#[tokio::test]
async fn test_fetch_through_executor_process() {
    let m = sales_model();
    let settings = Settings::from_toml_str(
        r#"
        [transport]
        command = "sh"
        args = ["-c", "cat > /dev/null; printf '[[[\"east\", 3], [\"west\", 4]]]'"]
        "#,
    )
    .unwrap();
    let transport =
        Rc::new(panelql::transport::ProcessTransport::from_settings(&settings).unwrap());
    let dash = Dashboard::with_settings(m.schema.clone(), transport, &settings);
    let panel = dash.create_panel(PanelOptions::default());

    let result = panel
        .fetch(
            &Selection::new()
                .with("region", &m.region)
                .with("revenue", &m.revenue),
            FetchOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[1]["revenue"], Value::Number(4.0));
}
