use axum::http::{StatusCode, header::CONTENT_TYPE};

use super::{
    ADMIN_PASSWORD, ADMIN_USERNAME, assert_res_ok, body_bytes, body_string, get,
    location, login_as_admin, post_form, send, test_app, valid_submission,
};
use crate::{
    auth::create_admin,
    feedback::{
        access::RESULTS_PASSWORD_KEY,
        config_store::load_schema,
        form_schema::{FormSchema, SectionKey},
    },
    settings::Setting,
    state::DbPool,
};

/// The form the editor would post for `schema`, with the pressed button.
fn draft_body(schema: &FormSchema, op: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, section) in schema.sections.iter().enumerate() {
        let name = |attr: &str| format!("sections[{i}][{attr}]");
        pairs.push((name("key"), section.key.to_string()));
        pairs.push((name("label"), section.label.clone()));
        pairs.push((name("label_localized"), section.label_localized.clone()));
        if section.enabled {
            pairs.push((name("enabled"), "true".to_string()));
        }
        if section.required {
            pairs.push((name("required"), "true".to_string()));
        }
        pairs.push((
            name("max_comment_length"),
            section.max_comment_length.to_string(),
        ));
    }
    for (i, field) in schema.fields.iter().enumerate() {
        let name = |attr: &str| format!("fields[{i}][{attr}]");
        pairs.push((name("key"), field.key.to_string()));
        pairs.push((name("label"), field.label.clone()));
        pairs.push((name("label_localized"), field.label_localized.clone()));
        if field.enabled {
            pairs.push((name("enabled"), "true".to_string()));
        }
        if field.required {
            pairs.push((name("required"), "true".to_string()));
        }
        pairs.push((name("kind"), field.kind.as_str().to_string()));
        pairs.push((name("options"), field.options.join("\n")));
    }
    pairs.push(("op".to_string(), op.to_string()));
    pairs
}

fn saved_schema(pool: &DbPool) -> FormSchema {
    let mut conn = pool.get().unwrap();
    load_schema(&mut conn).unwrap()
}

#[tokio::test]
async fn admin_pages_redirect_to_login() {
    let (app, _pool) = test_app();

    for uri in [
        "/admin/feedback",
        "/admin/feedback/export.csv",
        "/admin/feedback/form",
        "/admin/feedback/access",
    ] {
        let response = send(&app, get(uri, None)).await;
        assert!(response.status().is_redirection(), "{uri}");
        assert!(location(&response).starts_with("/login?next="), "{uri}");
    }
}

#[tokio::test]
async fn wrong_password_is_refused() {
    let (app, pool) = test_app();
    {
        let mut conn = pool.get().unwrap();
        create_admin(ADMIN_USERNAME, "admin@example.com", ADMIN_PASSWORD, &mut conn)
            .unwrap();
    }

    for (id, password) in [(ADMIN_USERNAME, "wrong-password"), ("nobody", ADMIN_PASSWORD)] {
        let response = send(
            &app,
            post_form("/login", &[("id", id), ("password", password)], None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            body_string(response)
                .await
                .contains("Incorrect username or password.")
        );
    }
}

#[tokio::test]
async fn dashboard_lists_and_deletes_feedback() {
    let (app, pool) = test_app();
    let cookie = login_as_admin(&app, &pool).await;

    let response = send(
        &app,
        post_form("/feedback", &valid_submission("Ada", "0771234567", "4"), None),
    )
    .await;
    assert_res_ok!(response);

    let response = send(&app, get("/admin/feedback", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Ada"));

    let id = {
        let mut conn = pool.get().unwrap();
        let records = crate::feedback::store::FeedbackStore::new(&mut *conn)
            .load_all(&crate::feedback::store::ReadGrant::for_tests())
            .unwrap();
        records[0].id.clone()
    };

    let response =
        send(&app, get(&format!("/admin/feedback/{id}"), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("0771234567"));

    let delete = format!("/admin/feedback/{id}/delete");
    let response =
        send(&app, post_form::<&str, &str>(&delete, &[], Some(&cookie))).await;
    assert!(response.status().is_redirection());

    let response =
        send(&app, post_form::<&str, &str>(&delete, &[], Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response =
        send(&app, get(&format!("/admin/feedback/{id}"), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_export_starts_with_a_bom() {
    let (app, pool) = test_app();
    let cookie = login_as_admin(&app, &pool).await;

    let response = send(
        &app,
        post_form("/feedback", &valid_submission("Ada", "0771234567", "5"), None),
    )
    .await;
    assert_res_ok!(response);

    let response =
        send(&app, get("/admin/feedback/export.csv", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );

    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("Submitted At,Name,Phone,Email"));
    assert!(lines.next().unwrap().contains("0771234567"));
}

#[tokio::test]
async fn pdf_exports_are_pdfs() {
    let (app, pool) = test_app();
    let cookie = login_as_admin(&app, &pool).await;

    let response = send(
        &app,
        post_form("/feedback", &valid_submission("Ada", "0771234567", "5"), None),
    )
    .await;
    assert_res_ok!(response);

    let response =
        send(&app, get("/admin/feedback/export.pdf", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/pdf");
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn draft_edits_are_only_saved_on_save() {
    let (app, pool) = test_app();
    let cookie = login_as_admin(&app, &pool).await;

    let response = send(&app, get("/admin/feedback/form", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut draft = saved_schema(&pool);
    let response = send(
        &app,
        post_form("/admin/feedback/form", &draft_body(&draft, "section:add"), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("unsaved changes"));
    assert!(body.contains("New section"));
    assert_eq!(saved_schema(&pool).sections.len(), 5);

    let response = send(
        &app,
        post_form("/admin/feedback/form", &draft_body(&draft, "section:delete:0"), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    draft.sections[1].label = "Talks".to_string();
    draft.sections.swap(3, 4);
    let response = send(
        &app,
        post_form("/admin/feedback/form", &draft_body(&draft, "save"), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("The form has been saved."));

    let saved = saved_schema(&pool);
    assert_eq!(saved.sections[1].label, "Talks");
    assert_eq!(saved.sections[3].key, SectionKey::from("venue".to_string()));
    assert_eq!(saved.sections[3].display_order, 3);

    let response = send(&app, get("/feedback", None)).await;
    assert!(body_string(response).await.contains("Talks"));
}

#[tokio::test]
async fn access_code_can_be_set_and_cleared() {
    let (app, pool) = test_app();
    let cookie = login_as_admin(&app, &pool).await;

    let response = send(
        &app,
        post_form("/admin/feedback/access", &[("code", "letmein")], Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response =
        send(&app, post_form("/results", &[("code", "letmein")], None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        post_form("/admin/feedback/access", &[("code", "")], Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    {
        let mut conn = pool.get().unwrap();
        let stored = Setting::fetch(RESULTS_PASSWORD_KEY, &mut conn).unwrap().unwrap();
        assert_eq!(stored.value, "");
    }

    let response = send(&app, post_form("/results", &[("code", "")], None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
