//! Browser session tests on a paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MemoryBackend;
use parts_catalog::browser::{BrowserHandle, BrowserOptions, BrowserSnapshot, Loadable};
use parts_catalog::{BrowseStatus, CatalogBackend};

const QUIET: Duration = Duration::from_millis(300);

fn options(page_size: usize) -> BrowserOptions {
    BrowserOptions {
        page_size,
        ..Default::default()
    }
}

fn spawn(backend: &Arc<MemoryBackend>, page_size: usize) -> BrowserHandle {
    let backend: Arc<dyn CatalogBackend> = backend.clone();
    BrowserHandle::spawn(backend, options(page_size))
}

fn names(snapshot: &BrowserSnapshot) -> Vec<&str> {
    snapshot.items.iter().map(|p| p.name.as_str()).collect()
}

/// Wait until the listing has settled on `term`.
async fn settled_on(handle: &mut BrowserHandle, term: &str) -> BrowserSnapshot {
    let term = term.to_string();
    handle
        .wait_for(move |s| {
            s.applied.as_ref().is_some_and(|c| c.search_term == term) && s.is_settled()
        })
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn mount_loads_first_page_and_facets() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);

    let snapshot = handle
        .wait_for(|s| s.is_settled() && s.brands.ready().is_some() && s.categories.ready().is_some())
        .await
        .unwrap();

    assert_eq!(snapshot.status(), BrowseStatus::Results);
    assert_eq!(snapshot.items.len(), common::ACTIVE_PRODUCTS);
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.current_page, 1);
    assert_eq!(snapshot.queries_issued, 1);
    assert_eq!(
        snapshot.brands,
        Loadable::Ready(vec!["Bosch".to_string(), "Hella".into(), "Makita".into()])
    );
    assert_eq!(snapshot.categories.ready().map(Vec::len), Some(2));
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn makita_search_returns_both_products_without_more() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    handle.set_search_term("makita").unwrap();
    let snapshot = settled_on(&mut handle, "makita").await;

    assert_eq!(names(&snapshot), vec!["Chave Makita", "Makita Furadeira"]);
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.status(), BrowseStatus::Results);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_issues_one_query() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    for term in ["m", "ma", "mak", "maki", "makita"] {
        handle.set_search_term(term).unwrap();
    }
    settled_on(&mut handle, "makita").await;
    tokio::time::sleep(QUIET * 5).await;

    let pages = backend.page_calls();
    assert_eq!(pages.len(), 2, "mount + one debounced query");
    assert_eq!(common::needle(&pages[1]), Some("makita"));
    assert_eq!(handle.snapshot().queries_issued, 2);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn spaced_edits_issue_one_query_each() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    for term in ["filtro", "disco", "chave"] {
        handle.set_search_term(term).unwrap();
        tokio::time::sleep(QUIET + Duration::from_millis(100)).await;
    }
    let snapshot = settled_on(&mut handle, "chave").await;

    let needles: Vec<Option<String>> = backend
        .page_calls()
        .iter()
        .map(|p| common::needle(p).map(str::to_string))
        .collect();
    assert_eq!(
        needles,
        vec![
            None,
            Some("filtro".to_string()),
            Some("disco".to_string()),
            Some("chave".to_string())
        ]
    );
    assert_eq!(names(&snapshot), vec!["Chave Makita"]);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn superseded_search_never_reaches_the_listing() {
    let backend = Arc::new(MemoryBackend::sample().with_latency(|plan| {
        match common::needle(plan) {
            Some("makita") => Duration::from_secs(2),
            _ => Duration::ZERO,
        }
    }));
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    handle.set_search_term("makita").unwrap();
    tokio::time::sleep(QUIET + Duration::from_millis(50)).await;
    assert_eq!(backend.page_calls().len(), 2, "makita query in flight");

    handle.set_search_term("filtro").unwrap();
    let snapshot = settled_on(&mut handle, "filtro").await;
    assert_eq!(names(&snapshot), vec!["Filtro de Óleo"]);

    // Let the slow response land.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let snapshot = handle.snapshot();
    assert_eq!(names(&snapshot), vec!["Filtro de Óleo"]);
    assert_eq!(
        snapshot.applied.map(|c| c.search_term),
        Some("filtro".to_string())
    );
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn unchanged_criteria_issue_no_query() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    handle.set_search_term("makita").unwrap();
    handle.set_search_term("").unwrap();
    handle.set_brand(None).unwrap();
    tokio::time::sleep(QUIET * 3).await;

    assert_eq!(backend.page_calls().len(), 1);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn no_matches_is_empty_not_failed() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    handle.set_search_term("inexistente").unwrap();
    let snapshot = settled_on(&mut handle, "inexistente").await;
    assert_eq!(snapshot.status(), BrowseStatus::Empty);

    handle.clear_filters().unwrap();
    let snapshot = settled_on(&mut handle, "").await;
    assert_eq!(snapshot.items.len(), common::ACTIVE_PRODUCTS);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn category_and_brand_filters_combine() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    handle
        .set_category(Some(common::TOOLS_CATEGORY.to_string()))
        .unwrap();
    handle.set_brand(Some("Makita".to_string())).unwrap();
    let snapshot = handle
        .wait_for(|s| {
            s.applied
                .as_ref()
                .is_some_and(|c| c.brand.as_deref() == Some("Makita"))
                && s.is_settled()
        })
        .await
        .unwrap();

    assert_eq!(names(&snapshot), vec!["Chave Makita", "Makita Furadeira"]);
    assert_eq!(backend.page_calls().len(), 2);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn failed_first_page_can_be_retried() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 50);
    settled_on(&mut handle, "").await;

    backend.fail_next(1);
    handle.set_search_term("makita").unwrap();
    let snapshot = handle
        .wait_for(|s| matches!(s.status(), BrowseStatus::Failed { .. }))
        .await
        .unwrap();
    assert!(snapshot.items.is_empty());

    handle.retry().unwrap();
    let snapshot = settled_on(&mut handle, "makita").await;
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.status(), BrowseStatus::Results);
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn load_more_accumulates_until_a_short_page() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut handle = spawn(&backend, 2);
    let snapshot = settled_on(&mut handle, "").await;
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.has_more);

    handle.load_more().unwrap();
    let snapshot = handle
        .wait_for(|s| s.current_page == 2 && s.is_settled())
        .await
        .unwrap();
    assert_eq!(snapshot.items.len(), 4);
    assert!(snapshot.has_more);

    handle.load_more().unwrap();
    let snapshot = handle
        .wait_for(|s| s.current_page == 3 && s.is_settled())
        .await
        .unwrap();
    assert_eq!(snapshot.items.len(), common::ACTIVE_PRODUCTS);
    assert!(!snapshot.has_more);
    assert_eq!(
        names(&snapshot),
        vec![
            "Chave Makita",
            "Disco de Corte",
            "Filtro de Óleo",
            "Makita Furadeira",
            "Rolamento 6205"
        ]
    );
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn sessions_are_independent() {
    let backend = Arc::new(MemoryBackend::sample());
    let mut first = spawn(&backend, 50);
    let mut second = spawn(&backend, 50);
    settled_on(&mut first, "").await;
    settled_on(&mut second, "").await;

    first.set_search_term("filtro").unwrap();
    settled_on(&mut first, "filtro").await;
    tokio::time::sleep(QUIET * 2).await;

    assert_eq!(second.snapshot().items.len(), common::ACTIVE_PRODUCTS);
    assert_eq!(second.snapshot().criteria.search_term, "");
    first.close().await;
    second.close().await;
}
