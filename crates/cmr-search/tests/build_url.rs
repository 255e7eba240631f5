//! End-to-end URL construction tests across record kinds.

use cmr_search::{
    CmrError, CollectionQuery, GranuleQuery, Mode, ServiceQuery, ToolQuery, VariableQuery,
};

#[test]
fn granule_url_encodes_filters_in_insertion_order() {
    let mut query = GranuleQuery::new();
    query
        .short_name("MOD09GA")
        .unwrap()
        .version("006")
        .unwrap()
        .point(-105.2705, 40.015)
        .unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         short_name=MOD09GA&version=006&point=-105.2705,40.015"
    );
}

#[test]
fn resetting_a_filter_keeps_its_position() {
    let mut query = GranuleQuery::new();
    query
        .short_name("MOD09GA")
        .unwrap()
        .version("006")
        .unwrap()
        .short_name("AST_L1T")
        .unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         short_name=AST_L1T&version=006"
    );
}

#[test]
fn list_params_repeat_with_bracket_syntax() {
    let mut query = GranuleQuery::new();
    query
        .concept_id(["C1299783579-LPDAAC_ECS", "G1441380236-PODAAC"])
        .unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         concept_id[]=C1299783579-LPDAAC_ECS&concept_id[]=G1441380236-PODAAC"
    );
}

#[test]
fn flags_serialize_lowercase() {
    let mut query = GranuleQuery::new();
    query
        .short_name("MOD09GA")
        .unwrap()
        .downloadable(true)
        .unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         short_name=MOD09GA&downloadable=true"
    );
}

#[test]
fn options_encode_as_bracketed_booleans() {
    let mut query = GranuleQuery::new();
    query.readable_granule_name(["A*", "B?"]).unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         readable_granule_name[]=A*&readable_granule_name[]=B?\
         &options[readable_granule_name][pattern]=true"
    );
}

#[test]
fn temporal_ranges_accumulate_and_fill_granularity() {
    let mut query = CollectionQuery::new();
    query
        .temporal(Some("2016-10-12T10:55:07Z"), None::<&str>, false)
        .unwrap()
        .temporal(Some("2016"), Some("2016"), false)
        .unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/collections.json?\
         temporal[]=2016-10-12T10:55:07Z,&temporal[]=2016-01-01T00:00:00Z,2016-12-31T23:59:59Z"
    );
}

#[test]
fn inverted_temporal_range_is_rejected() {
    let mut query = CollectionQuery::new();
    let result = query.temporal(Some("2017-01-01T00:00:00Z"), Some("2016-01-01T00:00:00Z"), false);
    assert!(matches!(result, Err(CmrError::InvalidValue { .. })));
    assert!(!query.params().contains("temporal"));
}

#[test]
fn polygon_requires_closed_ring() {
    let mut query = GranuleQuery::new();

    let open = [(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)];
    assert!(query.polygon(&open).is_err());

    query.short_name("test").unwrap();
    let closed = [(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)];
    query.polygon(&closed).unwrap();

    assert_eq!(
        query.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/granules.json?\
         short_name=test&polygon=1,1,2,1,2,2,1,1"
    );
}

#[test]
fn spatial_filter_without_collection_scope_fails_at_build_time() {
    let mut query = GranuleQuery::new();
    query
        .bounding_box(-10.0, -5.0, 10.0, 5.0)
        .unwrap();

    assert!(matches!(query.build_url(), Err(CmrError::InvalidState(_))));

    query.entry_title("Dataset").unwrap();
    assert!(query.build_url().is_ok());
}

#[test]
fn named_record_kinds_route_and_gate_correctly() {
    let mut tools = ToolQuery::new();
    tools.name("SOTO").unwrap();
    assert_eq!(
        tools.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/tools.json?name=SOTO"
    );

    let mut services = ServiceQuery::new();
    services.native_id(["harmony-gdal"]).unwrap();
    assert_eq!(
        services.build_url().unwrap(),
        "https://cmr.earthdata.nasa.gov/search/services.json?native_id[]=harmony-gdal"
    );

    let mut variables = VariableQuery::new();
    assert!(variables.concept_id(["C1299783579-LPDAAC_ECS"]).is_err());
    variables.concept_id(["V1299783579-LPDAAC_ECS"]).unwrap();
}

#[test]
fn extended_formats_are_kind_gated() {
    let mut collections = CollectionQuery::new();
    collections.format("umm_json_v1_4").unwrap();
    assert!(collections
        .build_url()
        .unwrap()
        .starts_with("https://cmr.earthdata.nasa.gov/search/collections.umm_json_v1_4?"));

    let mut granules = GranuleQuery::new();
    assert!(matches!(
        granules.format("opendata"),
        Err(CmrError::UnsupportedFormat(_))
    ));
}

#[test]
fn custom_mode_must_not_be_empty() {
    assert!(matches!(
        GranuleQuery::with_mode(&Mode::Custom(String::new())),
        Err(CmrError::InvalidMode(_))
    ));

    let query =
        GranuleQuery::with_mode(&Mode::Custom("http://localhost:3003".to_string())).unwrap();
    assert_eq!(
        query.build_url().unwrap(),
        "http://localhost:3003/granules.json?"
    );
}
