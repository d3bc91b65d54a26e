use slotscrape_core::models::{ExtractedGame, GameSource, Volatility};
use slotscrape_core::traits::GameStore;
use slotscrape_db::GameRepository;

use crate::integration::common::setup_test_db;

fn sweet_bonanza() -> ExtractedGame {
    let mut game = ExtractedGame::new("Sweet Bonanza", GameSource::StructuredData);
    game.provider = Some("Pragmatic Play".into());
    game.rtp = Some("96.51%".into());
    game.volatility = Some(Volatility::High);
    game.max_win = Some("21,100x".into());
    game.image = Some("https://cdn.casino.test/sweet.png".into());
    game.demo_url = Some("https://casino.test/play/sweet-bonanza".into());
    game
}

#[tokio::test]
async fn save_new_game_persists_all_fields() {
    let (pool, _container) = setup_test_db().await;
    let repo = GameRepository::new(pool);

    let saved = repo
        .save_game(&sweet_bonanza(), "https://casino.test/slots/sweet-bonanza")
        .await
        .unwrap();
    assert!(saved.created);
    assert_eq!(saved.slug, "sweet-bonanza");

    let record = repo.get_by_slug("sweet-bonanza").await.unwrap().unwrap();
    assert_eq!(record.id, saved.id);
    assert_eq!(record.name, "Sweet Bonanza");
    assert_eq!(record.provider, "Pragmatic Play");
    assert_eq!(record.rtp.as_deref(), Some("96.51%"));
    assert_eq!(record.volatility.as_deref(), Some("high"));
    assert_eq!(record.max_win.as_deref(), Some("21,100x"));
    assert_eq!(record.image_url.as_deref(), Some("https://cdn.casino.test/sweet.png"));
    assert_eq!(record.source_url, "https://casino.test/slots/sweet-bonanza");
}

#[tokio::test]
async fn duplicate_slug_returns_existing_id() {
    let (pool, _container) = setup_test_db().await;
    let repo = GameRepository::new(pool);

    let first = repo
        .save_game(&sweet_bonanza(), "https://a.test/sweet-bonanza")
        .await
        .unwrap();

    // Different casing and punctuation, same slug
    let again = ExtractedGame::new("sweet  BONANZA!", GameSource::Title);
    let second = repo
        .save_game(&again, "https://b.test/sweet-bonanza")
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.id, first.id);
    assert_eq!(repo.count().await.unwrap(), 1);

    // First write wins
    let record = repo.get_by_slug("sweet-bonanza").await.unwrap().unwrap();
    assert_eq!(record.source_url, "https://a.test/sweet-bonanza");
}

#[tokio::test]
async fn missing_provider_is_stored_as_unknown() {
    let (pool, _container) = setup_test_db().await;
    let repo = GameRepository::new(pool);

    let game = ExtractedGame::new("Book Of Dead", GameSource::UrlPath);
    repo.save_game(&game, "https://casino.test/book-of-dead")
        .await
        .unwrap();

    let record = repo.get_by_slug("book-of-dead").await.unwrap().unwrap();
    assert_eq!(record.provider, "Unknown");
    assert!(record.rtp.is_none());
}

#[tokio::test]
async fn name_without_slug_characters_is_rejected() {
    let (pool, _container) = setup_test_db().await;
    let repo = GameRepository::new(pool);

    let game = ExtractedGame::new("Ωμέγα", GameSource::Title);
    assert!(repo.save_game(&game, "https://casino.test/x").await.is_err());
    assert_eq!(repo.count().await.unwrap(), 0);
}
