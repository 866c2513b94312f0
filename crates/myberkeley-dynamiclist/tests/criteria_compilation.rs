use std::sync::Arc;

use myberkeley_dynamiclist::{AccessContext, AccessControlViolation, compile};

fn ced_context() -> AccessContext {
    AccessContext::new(
        "testcontext",
        [
            "/colleges/CED/standings/undergrad/majors/LIMITED",
            "/colleges/CED/standings/undergrad/majors/URBAN STUDIES",
            "/colleges/CED/standings/grad",
            "/colleges/CED/standings/grad/programs/ARCHITECTURE",
            "/colleges/CED/standings/grad/programs/CITY PLAN",
            "/colleges/ENV DSGN/standings/grad",
            "/colleges/ENV DSGN/departments/*",
        ],
        ["/standings/grad", "/standings/undergrad/*"],
    )
    .expect("context compiles")
}

#[test]
fn single_leaf_has_no_parentheses() {
    let query = compile(&ced_context(), "/colleges/ENV DSGN/standings/grad").unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         myb-demographics:\"/colleges/ENV DSGN/standings/grad\""
    );
}

#[test]
fn wildcard_criterion_collapses_single_operand() {
    let query = compile(
        &ced_context(),
        r#"{ALL: "/colleges/ENV DSGN/departments/POSTPOSTSTRUCTURALISMO"}"#,
    )
    .unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         myb-demographics:\"/colleges/ENV DSGN/departments/POSTPOSTSTRUCTURALISMO\""
    );
}

#[test]
fn two_branch_disjunction() {
    let query = compile(
        &ced_context(),
        r#"{ANY: ["/colleges/CED/standings/grad", "/colleges/ENV DSGN/standings/grad"]}"#,
    )
    .unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         (myb-demographics:\"/colleges/CED/standings/grad\" OR \
         myb-demographics:\"/colleges/ENV DSGN/standings/grad\")"
    );
}

#[test]
fn nested_conjunction_inside_disjunction() {
    let criteria = "{OR: [\
        {AND: [\"/colleges/CED/standings/grad\", \
              {OR: [\"/colleges/CED/standings/grad/programs/ARCHITECTURE\", \
                    \"/colleges/CED/standings/grad/programs/CITY PLAN\"] }\
        ]},\
        \"/colleges/CED/standings/undergrad/majors/LIMITED\", \
        \"/colleges/CED/standings/undergrad/majors/URBAN STUDIES\"\
    ]}";

    let query = compile(&ced_context(), criteria).unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         ((myb-demographics:\"/colleges/CED/standings/grad\" AND \
         (myb-demographics:\"/colleges/CED/standings/grad/programs/ARCHITECTURE\" OR \
         myb-demographics:\"/colleges/CED/standings/grad/programs/CITY PLAN\")) OR \
         myb-demographics:\"/colleges/CED/standings/undergrad/majors/LIMITED\" OR \
         myb-demographics:\"/colleges/CED/standings/undergrad/majors/URBAN STUDIES\")"
    );
}

#[test]
fn filtered_disjunction() {
    let query = compile(
        &ced_context(),
        r#"{ANY: ["/colleges/CED/standings/grad", "/colleges/ENV DSGN/standings/grad"],
            FILTER: "/standings/grad"}"#,
    )
    .unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         ((myb-demographics:\"/colleges/CED/standings/grad\" OR \
         myb-demographics:\"/colleges/ENV DSGN/standings/grad\") AND \
         myb-demographics:\"/standings/grad\")"
    );
}

#[test]
fn filter_of_several_terms_is_parenthesized() {
    let query = compile(
        &ced_context(),
        r#"{ALL: "/colleges/ENV DSGN/departments/ARCH",
            FILTER: {ANY: ["/standings/undergrad/senior", "/standings/undergrad/junior"]}}"#,
    )
    .unwrap();
    assert_eq!(
        query,
        "resourceType:myberkeley/personalDemographic AND \
         (myb-demographics:\"/colleges/ENV DSGN/departments/ARCH\" AND \
         (myb-demographics:\"/standings/undergrad/senior\" OR \
         myb-demographics:\"/standings/undergrad/junior\"))"
    );
}

#[test]
fn bad_criteria_is_rejected() {
    let err = compile(
        &ced_context(),
        r#"{OR: ["/colleges/CED/standings/grad", "NOT-ALLOWED"]}"#,
    )
    .unwrap_err();
    assert_eq!(err.path(), Some("NOT-ALLOWED"));
}

#[test]
fn no_criteria_is_rejected() {
    assert_eq!(compile(&ced_context(), ""), Err(AccessControlViolation::Empty));
}

#[test]
fn standalone_filter_is_rejected() {
    assert!(matches!(
        compile(&ced_context(), r#"{FILTER: "/standings/grad"}"#),
        Err(AccessControlViolation::StandaloneFilter { .. })
    ));
}

#[test]
fn filter_referencing_a_criterion_is_rejected() {
    assert!(matches!(
        compile(
            &ced_context(),
            r#"{ANY: ["/colleges/CED/standings/grad"], FILTER: "/colleges/CED/standings/grad"}"#,
        ),
        Err(AccessControlViolation::FilterNotAllowed { .. })
    ));
}

#[test]
fn compilation_is_deterministic() {
    let ctx = ced_context();
    let criteria = r#"{ANY: ["/colleges/CED/standings/grad", {ALL: ["/colleges/CED/standings/grad/programs/CITY PLAN", "/colleges/ENV DSGN/departments/X"]}], FILTER: "/standings/grad"}"#;
    assert_eq!(compile(&ctx, criteria).unwrap(), compile(&ctx, criteria).unwrap());
}

#[test]
fn shared_context_compiles_concurrently() {
    let ctx = Arc::new(ced_context());
    let expected = compile(&ctx, "/colleges/CED/standings/grad").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || compile(&ctx, "/colleges/CED/standings/grad").unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
