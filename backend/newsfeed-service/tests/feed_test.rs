mod common;

use common::{base_time, new_post, register, setup};
use feed_cache::{CacheStore, Ttl};
use newsfeed_service::domain::models::PostView;
use newsfeed_service::ServiceError;
use std::time::Duration;

fn ids(feed: &[PostView]) -> Vec<u64> {
    feed.iter().map(|view| view.post.id).collect()
}

#[tokio::test]
async fn test_second_feed_read_is_served_from_cache() {
    let ctx = setup();
    let user = register(&ctx.services, "alice").await;
    let post = ctx
        .services
        .posts
        .create_post(new_post(user.id, "hello world"))
        .await
        .unwrap();

    ctx.store.reset_calls();
    let first = ctx.services.feed.get_feed(user.id, 1, Some(10)).await.unwrap();
    assert_eq!(ids(&first), vec![post.id]);
    assert!(ctx.store.calls() > 0);

    ctx.store.reset_calls();
    let second = ctx.services.feed.get_feed(user.id, 1, Some(10)).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(ctx.store.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_followed_post_appears_after_feed_ttl() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    let bob = register(&ctx.services, "bob").await;
    ctx.services.users.follow(alice.id, bob.id).await.unwrap();

    let before = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert!(before.is_empty());

    let q = ctx
        .services
        .posts
        .create_post(new_post(bob.id, "new from bob"))
        .await
        .unwrap();

    // Still inside the cached page's lifetime
    tokio::time::advance(Duration::from_secs(60)).await;
    let stale = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert!(!ids(&stale).contains(&q.id));

    tokio::time::advance(Ttl::Short.duration()).await;
    let fresh = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert_eq!(ids(&fresh), vec![q.id]);
}

#[tokio::test]
async fn test_follow_does_not_touch_cached_feed_pages() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    let bob = register(&ctx.services, "bob").await;
    let own = ctx
        .services
        .posts
        .create_post(new_post(alice.id, "mine"))
        .await
        .unwrap();
    ctx.services
        .posts
        .create_post(new_post(bob.id, "bob's"))
        .await
        .unwrap();

    ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    ctx.services.users.follow(alice.id, bob.id).await.unwrap();

    let key = format!("user:{}:newsfeed:page:1", alice.id);
    assert!(ctx.cache.contains_key(&key).await);
    assert!(!ctx.cache.contains_key(&format!("user:{}", alice.id)).await);

    let feed = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert_eq!(ids(&feed), vec![own.id]);

    // Dropping the page shows the new follow set
    ctx.cache.delete(&key).await.unwrap();
    let feed = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert_eq!(feed.len(), 2);
}

#[tokio::test]
async fn test_feed_only_contains_own_and_followed_posts() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    let bob = register(&ctx.services, "bob").await;
    let carol = register(&ctx.services, "carol").await;
    let dave = register(&ctx.services, "dave").await;

    ctx.services.users.follow(alice.id, bob.id).await.unwrap();
    ctx.services.users.follow(alice.id, carol.id).await.unwrap();
    // Following yourself must not double count
    ctx.services.users.follow(alice.id, alice.id).await.unwrap();

    let mut expected = Vec::new();
    for (i, author) in [alice.id, bob.id, carol.id, dave.id].iter().cycle().take(12).enumerate() {
        let post = ctx
            .services
            .posts
            .create_post(new_post(*author, &format!("post {}", i)))
            .await
            .unwrap();
        if *author != dave.id {
            expected.push(post.id);
        }
    }
    expected.reverse();

    let feed = ctx.services.feed.get_feed(alice.id, 1, Some(20)).await.unwrap();
    assert_eq!(ids(&feed), expected);
    assert!(feed.iter().all(|view| view.post.user_id != dave.id));
}

#[tokio::test]
async fn test_pages_are_disjoint_and_complete() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    let bob = register(&ctx.services, "bob").await;
    ctx.services.users.follow(alice.id, bob.id).await.unwrap();

    let mut all = Vec::new();
    for i in 0..25 {
        let author = if i % 2 == 0 { alice.id } else { bob.id };
        let post = ctx
            .services
            .posts
            .create_post(new_post(author, &format!("post {}", i)))
            .await
            .unwrap();
        all.push(post.id);
    }
    all.reverse();

    let page1 = ids(&ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap());
    let page2 = ids(&ctx.services.feed.get_feed(alice.id, 2, Some(10)).await.unwrap());
    let page3 = ids(&ctx.services.feed.get_feed(alice.id, 3, Some(10)).await.unwrap());

    assert_eq!(page1, all[0..10].to_vec());
    assert_eq!(page2, all[10..20].to_vec());
    assert_eq!(page3, all[20..25].to_vec());
    assert!(ctx.services.feed.get_feed(alice.id, 4, Some(10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_equal_timestamps_order_by_id_descending() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;

    ctx.store.pin_time(base_time());
    let a = ctx.store.insert_post_raw(alice.id, "a");
    let b = ctx.store.insert_post_raw(alice.id, "b");
    let c = ctx.store.insert_post_raw(alice.id, "c");
    ctx.store.unpin_time();

    let feed = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap();
    assert_eq!(ids(&feed), vec![c.id, b.id, a.id]);
}

#[tokio::test]
async fn test_engagement_is_attached_fresh_to_cached_pages() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    let bob = register(&ctx.services, "bob").await;
    let post = ctx
        .services
        .posts
        .create_post(new_post(alice.id, "like me"))
        .await
        .unwrap();

    let feed = ctx.services.feed.get_feed(alice.id, 1, None).await.unwrap();
    assert!(feed[0].likes.is_empty());

    ctx.services.likes.like_post(post.id, bob.id).await.unwrap();

    // The page of summaries is still cached; the likes page is not
    let feed = ctx.services.feed.get_feed(alice.id, 1, None).await.unwrap();
    assert_eq!(feed[0].likes.len(), 1);
    assert_eq!(feed[0].likes[0].user_id, bob.id);
}

#[tokio::test]
async fn test_page_zero_is_rejected() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;

    let err = ctx.services.feed.get_feed(alice.id, 0, Some(10)).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_surfaces_timeout() {
    let ctx = setup();
    let alice = register(&ctx.services, "alice").await;
    ctx.store.set_latency(Duration::from_secs(30));

    let err = ctx.services.feed.get_feed(alice.id, 1, Some(10)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(5000)));
    assert!(!err.is_client_error());

    // Nothing was cached for the abandoned computation
    let key = format!("user:{}:newsfeed:page:1", alice.id);
    assert!(!ctx.cache.contains_key(&key).await);
}
