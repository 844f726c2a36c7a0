//! Property-based tests for query building and result decoding.

use std::collections::BTreeSet;
use std::sync::Arc;

use facetry_core::{
    Catalog, FacetSpec, FieldDefinition, FieldRegistry, FieldRole, QueryBucket, Settings,
};
use facetry_search::{
    CatalogSearch, Error, FacetAggregator, Highlighter, IndexResponse, MemoryIndex, QueryBuilder,
    SearchRequest,
};
use proptest::prelude::*;

use crate::common::{EchoBackend, catalog, doc, facet_counts};

/// Requests using only values the sample catalog accepts.
fn valid_request() -> impl Strategy<Value = SearchRequest> {
    (
        "[a-z ]{0,20}",
        proptest::option::of("[a-z]{1,10}"),
        proptest::sample::subsequence(vec!["pubag_full_txt", "full_text", "citation"], 0..=3),
        proptest::sample::subsequence(vec!["Agronomy Journal", "Science", "Weed Technology"], 0..=3),
        proptest::option::of(proptest::sample::select(vec![
            "relevance",
            "date-desc",
            "date-asc",
            "title",
        ])),
        1usize..50,
        1usize..=100,
    )
        .prop_map(|(text, author, buckets, journals, sort, page, size)| {
            let mut request = SearchRequest::new(text).with_page(page).with_page_size(size);
            if let Some(author) = author {
                request = request.with_field("author", author);
            }
            for bucket in buckets {
                request = request.with_facet("text_availability", bucket);
            }
            for journal in journals {
                request = request.with_facet("journal_name", journal);
            }
            if let Some(sort) = sort {
                request = request.with_sort(sort);
            }
            request
        })
}

proptest! {
    #[test]
    fn test_hit_order_survives_assembly(n in 1usize..10, seed in any::<u64>()) {
        let mut ids: Vec<String> = (0..n).map(|i| format!("doc-{i}")).collect();
        // Deterministic shuffle from the seed.
        let len = ids.len();
        for i in 0..len {
            let j = ((seed.rotate_left(i as u32) ^ i as u64) % len as u64) as usize;
            ids.swap(i, j);
        }

        let backend = Arc::new(EchoBackend::with_hits(ids.iter().map(|id| doc(id)).collect()));
        let service = CatalogSearch::new(catalog(), backend);
        let result = tokio_test::block_on(service.search(&SearchRequest::new("soil")))
            .unwrap();

        let out: Vec<String> = result.documents.iter().map(|d| d.id.clone()).collect();
        prop_assert_eq!(out, ids);
    }

    #[test]
    fn test_only_highlight_fields_are_requested(flags in proptest::collection::vec(any::<bool>(), 1..8)) {
        let mut registry = FieldRegistry::new();
        for (i, highlighted) in flags.iter().enumerate() {
            let mut def = FieldDefinition::new(format!("field_{i}"), "").with_role(FieldRole::Index);
            if *highlighted {
                def = def.highlighted();
            }
            registry.register(def).unwrap();
        }
        let settings = Settings::default();
        let query = QueryBuilder::new(&registry, &settings)
            .build(&SearchRequest::new("soil"))
            .unwrap();

        let requested: Vec<String> = query.highlight.fields.iter().map(|f| f.key.clone()).collect();
        let expected: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, h)| **h)
            .map(|(i, _)| format!("field_{i}"))
            .collect();
        prop_assert_eq!(requested, expected);
    }

    #[test]
    fn test_build_is_deterministic(request in valid_request()) {
        let catalog = catalog();
        let builder = QueryBuilder::new(&catalog.registry, &catalog.settings);
        let first = builder.build(&request).unwrap();
        let second = builder.build(&request).unwrap();
        prop_assert_eq!(first.query_string(), second.query_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_offset_follows_page(page in 1usize..10_000, size in 1usize..=100) {
        let catalog = catalog();
        let query = QueryBuilder::new(&catalog.registry, &catalog.settings)
            .build(&SearchRequest::default().with_page(page).with_page_size(size))
            .unwrap();
        prop_assert_eq!(query.offset, (page - 1) * size);
        prop_assert_eq!(query.limit, size);
        prop_assert_eq!(query.page(), page);
    }

    #[test]
    fn test_oversized_pages_rejected(size in 101usize..10_000) {
        let catalog = catalog();
        let result = QueryBuilder::new(&catalog.registry, &catalog.settings)
            .build(&SearchRequest::default().with_page_size(size));
        let rejected = matches!(result, Err(Error::InvalidPagination { .. }));
        prop_assert!(rejected, "page size {} was accepted", size);
    }

    #[test]
    fn test_buckets_keep_declared_order(
        order in Just(vec!["pubag_full_txt", "full_text", "citation"]).prop_shuffle(),
        counts in proptest::collection::vec(1u64..1000, 3),
    ) {
        let catalog = catalog();
        let pairs: Vec<(&str, u64)> = order.iter().copied().zip(counts.iter().copied()).collect();
        let facets = FacetAggregator::new(&catalog.registry)
            .decode(&facet_counts("text_availability", &pairs), &[]);

        let keys: Vec<&str> = facets[0].items.iter().map(|i| i.value.as_str()).collect();
        prop_assert_eq!(keys, ["pubag_full_txt", "full_text", "citation"]);
        for item in &facets[0].items {
            let expected = pairs.iter().find(|(k, _)| *k == item.value).map(|(_, c)| *c);
            prop_assert_eq!(Some(item.count), expected);
        }
    }

    #[test]
    fn test_fallback_is_a_prefix(text in "[a-z ]{1,200}", len in 1usize..100) {
        prop_assume!(!text.trim().is_empty());
        let hl = Highlighter::default();
        let snippets: Vec<String> = hl.highlight(&text, &BTreeSet::new(), len).iter().collect();
        prop_assert_eq!(snippets.len(), 1);
        prop_assert!(text.starts_with(&snippets[0]));
        prop_assert_eq!(snippets[0].chars().count(), text.chars().count().min(len));
    }

    #[test]
    fn test_snippets_are_bounded(words in proptest::collection::vec("(soil|crop|[a-z]{3,8})", 1..60)) {
        let text = words.join(" ");
        let hl = Highlighter::new("<b>", "</b>", 3);
        let terms: BTreeSet<String> = ["soil".to_string()].into();
        let snippets = hl.highlight(&text, &terms, 30);
        let all: Vec<String> = snippets.iter().collect();
        prop_assert!(all.len() <= 3);
        if !snippets.is_fallback() {
            prop_assert!(all.iter().all(|s| s.contains("<b>soil</b>")));
        }
    }
}

#[test]
fn test_more_detection_uses_one_extra_value() {
    let catalog = catalog();
    let query = QueryBuilder::new(&catalog.registry, &catalog.settings)
        .build(&SearchRequest::default())
        .unwrap();
    let journal = query.facets.iter().find(|f| f.key == "journal_name").unwrap();
    assert_eq!(journal.limit, Some(6));

    let six = [
        ("A", 6),
        ("B", 5),
        ("C", 4),
        ("D", 3),
        ("E", 2),
        ("F", 1),
    ];
    let facets = FacetAggregator::new(&catalog.registry)
        .decode(&facet_counts("journal_name", &six), &[]);
    assert!(facets[0].has_more);
    assert_eq!(facets[0].items.len(), 5);

    let facets = FacetAggregator::new(&catalog.registry)
        .decode(&facet_counts("journal_name", &six[..5]), &[]);
    assert!(!facets[0].has_more);
}

#[test]
fn test_overlapping_buckets_are_counted_in_each() {
    let mut registry = FieldRegistry::new();
    registry
        .register(
            FieldDefinition::new("access", "Access").with_facet(FacetSpec::Query {
                buckets: vec![
                    QueryBucket {
                        key: "citation".to_string(),
                        label: "Citation".to_string(),
                        filter: "+format:citation".parse().unwrap(),
                    },
                    QueryBucket {
                        key: "aris".to_string(),
                        label: "ARIS".to_string(),
                        filter: "+aris:*".parse().unwrap(),
                    },
                ],
                always_show: false,
            }),
        )
        .unwrap();
    let catalog = Catalog::new(registry, Settings::default()).unwrap();

    let mut both = doc("both");
    both.fields.insert("aris".to_string(), "x".into());
    let backend = MemoryIndex::new(vec![both, doc("plain")]);
    let service = CatalogSearch::new(catalog, Arc::new(backend));

    let result = tokio_test::block_on(service.search(&SearchRequest::default()))
        .unwrap();
    let counts: Vec<(&str, u64)> = result.facets[0]
        .items
        .iter()
        .map(|i| (i.value.as_str(), i.count))
        .collect();

    // "both" lands in both buckets, so counts sum past the total.
    assert_eq!(counts, [("citation", 2), ("aris", 1)]);
    assert_eq!(result.total_count, 2);
}

#[test]
fn test_empty_response_decodes_to_empty_page() {
    let service = CatalogSearch::new(
        catalog(),
        Arc::new(EchoBackend::with_response(IndexResponse::default())),
    );
    let result = tokio_test::block_on(service.search(&SearchRequest::new("nothing")))
        .unwrap();
    assert!(result.documents.is_empty());
    assert!(result.facets.is_empty());
    assert_eq!(result.total_pages, 0);
}
