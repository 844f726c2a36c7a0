//! Loading the sample catalog and rejecting broken ones.

use std::path::PathBuf;

use facetry_core::{Catalog, CatalogConfig, Error, FieldRole, View};

use crate::common::CATALOG;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.toml")
}

fn load_variant(toml: &str) -> facetry_core::Result<Catalog> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(&path, toml).unwrap();
    Catalog::load(&path)
}

#[test]
fn test_sample_catalog_loads_from_disk() {
    let catalog = Catalog::load(sample_path()).unwrap();
    let registry = &catalog.registry;

    let facets: Vec<_> = registry
        .fields_with_role(FieldRole::Facetable)
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(
        facets,
        [
            "text_availability",
            "datasets",
            "publication_year",
            "journal_name",
            "subject_term",
            "subject_category",
        ]
    );

    let index: Vec<_> = registry
        .fields_with_role(View::Index.role())
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(index, ["author", "issn", "subject", "abstract"]);

    let sorts: Vec<_> = registry.sort_options().iter().map(|s| s.key.as_str()).collect();
    assert_eq!(sorts, ["relevance", "date-desc", "date-asc", "title"]);
    assert_eq!(
        registry.default_sort().unwrap().clause.to_string(),
        "score desc, date desc, title_sort asc"
    );

    let abstract_field = registry.lookup("abstract").unwrap();
    assert_eq!(abstract_field.fragment_size, Some(80));
    assert_eq!(abstract_field.alternate_max_length, Some(400));
    assert_eq!(registry.view(View::Show).title_field.as_deref(), Some("title"));
    assert_eq!(catalog.settings.params["title_qf"], "title^5 title_alt^2");
}

#[test]
fn test_duplicate_field_rejected() {
    let toml = format!("{CATALOG}\n[[fields]]\nkey = \"issn\"\n");
    assert!(matches!(
        load_variant(&toml),
        Err(Error::DuplicateField { key }) if key == "issn"
    ));
}

#[test]
fn test_dangling_sort_field_rejected() {
    let toml = format!("{CATALOG}\n[[sorts]]\nkey = \"pages\"\nclause = \"page_count asc\"\n");
    let err = load_variant(&toml).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("page_count"));
}

#[test]
fn test_undeclared_param_reference_rejected() {
    let toml = CATALOG.replace("$subject_pf", "$subject_phrase");
    assert!(matches!(load_variant(&toml), Err(Error::Config { .. })));
}

#[test]
fn test_malformed_bucket_filter_rejected() {
    let toml = CATALOG.replace("filter = \"+aris:*\"", "filter = \"+aris\"");
    let err = CatalogConfig::from_toml_str(&toml).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        Catalog::load("/nonexistent/catalog.toml"),
        Err(Error::Io(_))
    ));
}
