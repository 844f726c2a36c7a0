//! End-to-end searches over the sample catalog and documents.

use std::sync::Arc;

use facetry_search::{CatalogSearch, DisplayFacet, Error, IndexResponse, SearchRequest};

use crate::common::{EchoBackend, catalog, doc, facet_counts, memory_service};

fn ids(result: &facetry_search::DisplayResult) -> Vec<&str> {
    result.documents.iter().map(|d| d.id.as_str()).collect()
}

fn items(facet: &DisplayFacet) -> Vec<(&str, u64)> {
    facet.items.iter().map(|i| (i.value.as_str(), i.count)).collect()
}

fn facet<'a>(result: &'a facetry_search::DisplayResult, key: &str) -> &'a DisplayFacet {
    result.facets.iter().find(|f| f.key == key).unwrap()
}

#[tokio::test]
async fn test_free_text_search() {
    let result = memory_service()
        .search(&SearchRequest::new("nitrogen"))
        .await
        .unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(ids(&result), ["pubag-001", "pubag-004"]);
    assert_eq!(result.sort.as_deref(), Some("relevance"));

    let first = &result.documents[0];
    assert_eq!(
        first.title.as_deref(),
        Some("Soil nitrogen retention under winter cover crops")
    );
    assert_eq!(first.display_type.as_deref(), Some("fulltext"));

    let keys: Vec<_> = first.fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["author", "issn", "subject", "abstract"]);

    let abstract_field = first.field("abstract").unwrap();
    assert!(abstract_field.highlighted);
    assert!(abstract_field.values[0].contains("<b>nitrogen</b>"));
    assert!(abstract_field.values.iter().all(|v| v.chars().count() <= 80 + 14));
    assert!(!first.field("issn").unwrap().highlighted);
}

#[tokio::test]
async fn test_facets_in_registry_and_declared_order() {
    let result = memory_service()
        .search(&SearchRequest::new("nitrogen"))
        .await
        .unwrap();

    let keys: Vec<_> = result.facets.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "text_availability",
            "datasets",
            "publication_year",
            "journal_name",
            "subject_term",
            "subject_category",
        ]
    );

    let text = facet(&result, "text_availability");
    assert_eq!(text.label, "Text Availability");
    assert_eq!(items(text), [("pubag_full_txt", 1), ("citation", 1)]);
    assert_eq!(text.items[1].label, "Citation Only");

    assert_eq!(
        items(facet(&result, "publication_year")),
        [("before_2000", 1), ("since_2010", 1)]
    );
    assert_eq!(
        items(facet(&result, "journal_name")),
        [("Agronomy Journal", 2)]
    );
    assert_eq!(
        items(facet(&result, "subject_term")),
        [("nitrogen", 2), ("cover crops", 1), ("wheat", 1)]
    );
}

#[tokio::test]
async fn test_bucket_selection_filters_and_flags() {
    let result = memory_service()
        .search(&SearchRequest::default().with_facet("text_availability", "citation"))
        .await
        .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(ids(&result), ["pubag-002", "pubag-006", "pubag-004"]);

    let text = facet(&result, "text_availability");
    assert_eq!(items(text), [("citation", 3)]);
    assert!(text.items[0].selected);
}

#[tokio::test]
async fn test_range_selection() {
    let result = memory_service()
        .search(&SearchRequest::default().with_facet("publication_year", "since_2010"))
        .await
        .unwrap();
    assert_eq!(result.total_count, 3);
}

#[tokio::test]
async fn test_fielded_search() {
    let result = memory_service()
        .search(&SearchRequest::default().with_field("title", "cover"))
        .await
        .unwrap();
    assert_eq!(ids(&result), ["pubag-005", "pubag-001"]);
}

#[tokio::test]
async fn test_sort_and_pagination() {
    let service = memory_service();
    let result = service
        .search(&SearchRequest::default().with_sort("date-asc"))
        .await
        .unwrap();
    assert_eq!(
        ids(&result),
        ["pubag-004", "pubag-006", "pubag-002", "pubag-001", "pubag-005", "pubag-003"]
    );

    let result = service
        .search(
            &SearchRequest::default()
                .with_sort("date-asc")
                .with_page(2)
                .with_page_size(4),
        )
        .await
        .unwrap();
    assert_eq!(ids(&result), ["pubag-005", "pubag-003"]);
    assert_eq!(result.current_page, 2);
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.page_size, 4);
}

#[tokio::test]
async fn test_unmatched_highlight_field_falls_back_to_raw_value() {
    let result = memory_service()
        .search(&SearchRequest::new("tillage"))
        .await
        .unwrap();
    let doc = &result.documents[0];
    assert_eq!(doc.id, "pubag-002");

    let abstract_field = doc.field("abstract").unwrap();
    assert!(!abstract_field.highlighted);
    assert_eq!(
        abstract_field.values,
        ["No-till management increased soil organic carbon near the surface but not deeper in the profile."]
    );
    assert_eq!(doc.field("subject").unwrap().values, ["<b>tillage</b>"]);
}

#[tokio::test]
async fn test_request_errors() {
    let service = memory_service();

    let err = service
        .search(&SearchRequest::default().with_sort("bogus-sort"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownSortKey { key } if key == "bogus-sort"));

    let err = service
        .search(&SearchRequest::default().with_page_size(101))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPagination { .. }));

    let err = service
        .search(&SearchRequest::default().with_facet("issn", "0002-1962"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FieldRole { .. }));

    let err = service
        .search(&SearchRequest::default().with_facet("datasets", "none"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFacetValue { .. }));
}

#[tokio::test]
async fn test_show_view() {
    let service = memory_service();
    let doc = service.show("pubag-002").await.unwrap();

    assert_eq!(
        doc.title.as_deref(),
        Some("Tillage effects on soil organic carbon in the Corn Belt")
    );
    let keys: Vec<_> = doc.fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["author", "journal", "issn", "subject", "abstract"]);
    assert_eq!(doc.field("journal").unwrap().label, "Source");

    assert!(matches!(
        service.show("pubag-999").await,
        Err(Error::DocumentNotFound { .. })
    ));
}

#[tokio::test]
async fn test_backend_receives_structured_query() {
    let backend = Arc::new(EchoBackend::with_hits(vec![doc("a")]));
    let service = CatalogSearch::new(catalog(), backend.clone());

    service
        .search(
            &SearchRequest::new("soil")
                .with_field("author", "Kaspar")
                .with_facet("journal_name", "Agronomy Journal"),
        )
        .await
        .unwrap();

    let query = backend.last_query().unwrap();
    assert_eq!(query.params["q"], "soil");
    assert_eq!(query.params["q1"], "Kaspar");
    assert_eq!(query.params["author_qf"], "author^3 author_primary^5");
    assert_eq!(query.request_params["spellcheck.dictionary"], "author");
    assert_eq!(
        query.filter_strings(),
        ["{!term f=journal_name}Agronomy Journal"]
    );
    let highlighted: Vec<_> = query.highlight.fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(highlighted, ["author", "subject", "abstract"]);
    assert_eq!(query.highlight.field("abstract").unwrap().fragment_size, 80);
    assert!(query.return_fields.starts_with(&["id".to_string(), "title".to_string()]));
}

#[tokio::test]
async fn test_inconsistent_response_is_rejected() {
    let backend = Arc::new(EchoBackend::with_response(IndexResponse {
        total: 1,
        hits: vec![facetry_core::RawDocument::new("no-author")],
        facet_counts: facet_counts("journal_name", &[("Science", 1)]),
        ..Default::default()
    }));
    let service = CatalogSearch::new(catalog(), backend);

    // The sample catalog does not mark author as required, so this succeeds.
    let result = service.search(&SearchRequest::default()).await.unwrap();
    assert!(result.documents[0].fields.is_empty());

    let oversized = Arc::new(EchoBackend::with_hits((0..11).map(|i| doc(&i.to_string())).collect()));
    let service = CatalogSearch::new(catalog(), oversized);
    let err = service.search(&SearchRequest::default()).await.unwrap_err();
    assert!(matches!(err, Error::InconsistentResponse { .. }));
}
