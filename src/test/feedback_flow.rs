use axum::http::StatusCode;
use diesel::prelude::*;

use super::{
    assert_res_ok, body_string, get, post_form, send, test_app, valid_submission,
};
use crate::{
    feedback::{Feedback, access::RESULTS_PASSWORD_KEY},
    schema::feedback,
    settings::Setting,
};

fn stored(pool: &crate::state::DbPool) -> Vec<Feedback> {
    let mut conn = pool.get().unwrap();
    feedback::table
        .select(Feedback::as_select())
        .load(&mut conn)
        .unwrap()
}

#[tokio::test]
async fn form_shows_the_default_sections() {
    let (app, _pool) = test_app();

    let response = send(&app, get("/feedback", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(r#"name="sections[overall][rating]""#));
    assert!(body.contains(r#"name="fields[phone]""#));
    assert!(body.contains("Venue"));
}

#[tokio::test]
async fn submission_is_stored() {
    let (app, pool) = test_app();

    let response = send(
        &app,
        post_form("/feedback", &valid_submission("Ada", "0771234567", "5"), None),
    )
    .await;
    assert_res_ok!(response);

    let records = stored(&pool);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name.as_deref(), Some("Ada"));
    assert_eq!(record.overall_rating, 5);
    assert_eq!(record.overall_comments.as_deref(), Some("Great event"));
    assert_eq!(record.venue_rating, Some(4));
    assert_eq!(record.venue_comments, None);
    assert_eq!(record.sessions_rating, None);
    assert_eq!(record.email, None);
    assert_eq!(record.custom_data, None);
}

#[tokio::test]
async fn rejected_submission_keeps_the_answers() {
    let (app, pool) = test_app();

    let response = send(
        &app,
        post_form(
            "/feedback",
            &[
                ("fields[name]", "Ada Lovelace"),
                ("fields[phone]", "0771234567"),
                ("sections[venue][rating]", "2"),
                ("suggestions", "More coffee"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_string(response).await;
    assert!(body.contains("Please give a rating for"));
    assert!(body.contains(r#"value="Ada Lovelace""#));
    assert!(body.contains("More coffee"));
    assert!(stored(&pool).is_empty());
}

#[tokio::test]
async fn missing_required_field_is_reported_before_ratings() {
    let (app, _pool) = test_app();

    let response = send(
        &app,
        post_form(
            "/feedback",
            &[("fields[name]", "Ada"), ("fields[phone]", "   ")],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("Please fill in"));
    assert!(!body.contains("Please give a rating for"));
}

#[tokio::test]
async fn results_stay_closed_without_a_code() {
    let (app, _pool) = test_app();

    let response = send(&app, get("/results", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post_form("/results", &[("code", "")], None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("Public results are disabled."));

    let response =
        send(&app, post_form("/results", &[("code", "guess")], None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("Invalid access code."));
}

#[tokio::test]
async fn results_with_the_right_code_hide_contact_details() {
    let (app, pool) = test_app();

    for (name, phone, overall) in [("Ada", "0771234567", "5"), ("Grace", "0719876543", "2")] {
        let response = send(
            &app,
            post_form("/feedback", &valid_submission(name, phone, overall), None),
        )
        .await;
        assert_res_ok!(response);
    }
    {
        let mut conn = pool.get().unwrap();
        Setting::upsert(RESULTS_PASSWORD_KEY, "Colombo2024", None, &mut conn)
            .unwrap();
    }

    let response =
        send(&app, post_form("/results", &[("code", "colombo2024")], None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response =
        send(&app, post_form("/results", &[("code", "Colombo2024")], None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    // (5 + 2) / 2
    assert!(body.contains("3.5"), "{body}");
    assert!(body.contains("Great event"));
    assert!(!body.contains("0771234567"));
    assert!(!body.contains("0719876543"));
}
