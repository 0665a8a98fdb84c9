use crate::HttpStatusCode;

#[test]
fn given_status_codes_when_categorized_then_client_and_server_ranges_are_disjoint() {
    // GIVEN: One code from each interesting range
    let not_found = HttpStatusCode::from(404);
    let internal = HttpStatusCode::from(500);
    let ok = HttpStatusCode::from(200);

    // THEN: Each falls in exactly its own category
    assert!(not_found.is_client_error() && !not_found.is_server_error());
    assert!(internal.is_server_error() && !internal.is_client_error());
    assert!(!ok.is_client_error() && !ok.is_server_error());
}

#[test]
fn given_status_code_when_displayed_then_prints_bare_number() {
    assert_eq!(HttpStatusCode(503).to_string(), "503");
}
