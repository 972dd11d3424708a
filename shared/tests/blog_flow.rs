use blog_shared::{
    auth,
    error::ServiceError,
    gate::CallerIdentity,
    posts::{self, PostDraft},
    types::{LoginRequest, RegisterRequest},
    AppState,
};
use chrono::Duration;

async fn sign_up_and_in(state: &AppState, name: &str, email: &str) -> CallerIdentity {
    auth::register(
        state,
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some("secret123".to_string()),
        },
    )
    .await
    .unwrap();

    let session = auth::login(
        state,
        LoginRequest {
            email: Some(email.to_string()),
            password: Some("secret123".to_string()),
        },
    )
    .await
    .unwrap();

    let user_id = state.identity.resolve(&session.token).await.unwrap();
    assert_eq!(user_id, session.user.id);
    CallerIdentity { user_id }
}

fn draft(title: &str, content: &str) -> PostDraft {
    PostDraft::from_fields(Some(title.to_string()), Some(content.to_string())).unwrap()
}

#[tokio::test]
async fn author_owns_post_lifecycle() {
    let state = AppState::in_memory(Duration::hours(1));

    let alice = sign_up_and_in(&state, "Alice", "alice@example.com").await;
    let created = posts::create_post(
        &state,
        &alice,
        draft("Hello World wide enough", "Some content body"),
    )
    .await
    .unwrap();
    let author = created.author.clone().unwrap();
    assert_eq!(author.name, "Alice");
    assert_eq!(author.email, "alice@example.com");

    let listed = posts::list_posts(&state).await.unwrap();
    assert_eq!(listed[0].id, created.id);

    let updated = posts::update_post(
        &state,
        &created.id,
        &alice,
        draft("Hello World wide enough", "Edited content body"),
    )
    .await
    .unwrap();
    assert_eq!(updated.content, "Edited content body");
    assert_eq!(
        posts::get_post(&state, &created.id).await.unwrap().content,
        "Edited content body"
    );

    let bob = sign_up_and_in(&state, "Bob", "bob@example.com").await;
    let err = posts::update_post(&state, &created.id, &bob, draft("Mine now", "Taken over"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Forbidden("Not authorized to update this post".to_string())
    );
    assert_eq!(err.status().as_u16(), 401);
    assert_eq!(
        posts::get_post(&state, &created.id).await.unwrap().content,
        "Edited content body"
    );

    let err = posts::delete_post(&state, &created.id, &bob).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    posts::delete_post(&state, &created.id, &alice).await.unwrap();
    assert!(matches!(
        posts::get_post(&state, &created.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn list_is_newest_first() {
    let state = AppState::in_memory(Duration::hours(1));
    let alice = sign_up_and_in(&state, "Alice", "alice@example.com").await;

    let mut ids = Vec::new();
    for n in 0..3 {
        let post = posts::create_post(&state, &alice, draft(&format!("Post {}", n), "Body"))
            .await
            .unwrap();
        ids.push(post.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed: Vec<String> = posts::list_posts(&state)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
}
