//! End-to-end ranking flows against an in-memory database

use orion_common::db::init_memory_database;
use orion_common::Tier;
use orion_rank::engine::{RankingEngine, RankingStep, SessionView};
use orion_rank::error::Error;
use orion_rank::films::CatalogFilm;
use orion_rank::rating::RatingParams;
use orion_rank::session::Verdict;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

async fn engine() -> RankingEngine {
    let pool = init_memory_database().await.unwrap();
    RankingEngine::load(pool).await.unwrap()
}

async fn add(engine: &RankingEngine, user: &str, title: &str) -> Uuid {
    engine.add_film(user, title, None, None).await.unwrap().item.entry.id
}

/// Rank `title` into `tier`, answering every comparison with `decide(candidate_title)`
async fn rank_with<F>(engine: &RankingEngine, user: &str, title: &str, tier: Tier, decide: F) -> RankingStep
where
    F: Fn(&str) -> Verdict,
{
    let entry = add(engine, user, title).await;
    let mut step = engine.set_tier(user, entry, tier, None).await.unwrap();
    loop {
        match &step.view {
            SessionView::Comparing { candidate, .. } => {
                let verdict = decide(&candidate.film.title);
                let shown = candidate.entry.id;
                step = engine
                    .submit_verdict(user, entry, verdict, shown, step.session)
                    .await
                    .unwrap();
            }
            _ => return step,
        }
    }
}

async fn titles(engine: &RankingEngine, user: &str) -> Vec<String> {
    engine
        .list_view(user)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.item.film.title)
        .collect()
}

#[tokio::test]
async fn test_empty_tier_finalizes_immediately() {
    let engine = engine().await;
    rank_with(&engine, "u1", "Okay Film", Tier::Ok, |_| Verdict::TargetWins).await;

    let entry = add(&engine, "u1", "Loved Film").await;
    let step = engine.set_tier("u1", entry, Tier::Liked, None).await.unwrap();

    match step.view {
        SessionView::Finalized { rank_in_tier, tier, target } => {
            assert_eq!(rank_in_tier, 0);
            assert_eq!(tier, Tier::Liked);
            assert_eq!(target.entry.position, 0);
        }
        other => panic!("expected finalized view, got {:?}", other),
    }
    assert!(step.session.is_none());
    assert_eq!(titles(&engine, "u1").await, vec!["Loved Film", "Okay Film"]);
}

#[tokio::test]
async fn test_binary_search_places_new_top_of_tier() {
    let engine = engine().await;
    for title in ["B", "C", "D"] {
        rank_with(&engine, "u1", title, Tier::Ok, |_| Verdict::CandidateWins).await;
    }
    assert_eq!(titles(&engine, "u1").await, vec!["B", "C", "D"]);

    let entry = add(&engine, "u1", "A").await;
    let step = engine.set_tier("u1", entry, Tier::Ok, None).await.unwrap();
    let SessionView::Comparing { candidate, lo, hi, .. } = &step.view else {
        panic!("expected a comparison");
    };
    assert_eq!((*lo, *hi), (0, 3));
    assert_eq!(candidate.film.title, "C");
    let shown = candidate.entry.id;

    let step = engine
        .submit_verdict("u1", entry, Verdict::TargetWins, shown, step.session)
        .await
        .unwrap();
    let SessionView::Comparing { candidate, lo, hi, .. } = &step.view else {
        panic!("expected a second comparison");
    };
    assert_eq!((*lo, *hi), (0, 1));
    assert_eq!(candidate.film.title, "B");
    let shown = candidate.entry.id;

    let step = engine
        .submit_verdict("u1", entry, Verdict::TargetWins, shown, step.session)
        .await
        .unwrap();
    assert!(matches!(step.view, SessionView::Finalized { rank_in_tier: 0, .. }));
    assert_eq!(titles(&engine, "u1").await, vec!["A", "B", "C", "D"]);
}

#[tokio::test]
async fn test_ranked_list_follows_preferences() {
    let engine = engine().await;
    let preference = ["Alien", "Brazil", "Casablanca", "Dune", "Eraserhead", "Fargo"];
    let better = |a: &str, b: &str| {
        let pos = |t: &str| preference.iter().position(|p| *p == t).unwrap();
        pos(a) < pos(b)
    };

    for title in ["Dune", "Alien", "Fargo", "Casablanca", "Eraserhead", "Brazil"] {
        rank_with(&engine, "u1", title, Tier::Liked, |candidate| {
            if better(title, candidate) {
                Verdict::TargetWins
            } else {
                Verdict::CandidateWins
            }
        })
        .await;
    }

    assert_eq!(titles(&engine, "u1").await, preference);
    let positions: Vec<i64> = engine
        .list_view("u1")
        .await
        .unwrap()
        .iter()
        .map(|e| e.item.entry.position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_tiers_stay_contiguous_and_unset_trails() {
    let engine = engine().await;
    rank_with(&engine, "u1", "Disliked One", Tier::Disliked, |_| Verdict::TargetWins).await;
    add(&engine, "u1", "Pending").await;
    rank_with(&engine, "u1", "Liked One", Tier::Liked, |_| Verdict::TargetWins).await;
    rank_with(&engine, "u1", "Ok One", Tier::Ok, |_| Verdict::TargetWins).await;

    let list = engine.list_view("u1").await.unwrap();
    let tiers: Vec<Tier> = list.iter().map(|e| e.item.entry.tier).collect();
    assert_eq!(tiers, vec![Tier::Liked, Tier::Ok, Tier::Disliked, Tier::Unset]);
    let scores: Vec<Option<f64>> = list.iter().map(|e| e.display_score).collect();
    assert_eq!(scores[0], orion_rank::scoring::display_score(Tier::Liked, 0, 1));
    assert_eq!(&scores[1..], &[Some(5.0), Some(1.67), None]);
}

#[tokio::test]
async fn test_verdicts_update_ratings_and_history() {
    let engine = engine().await;
    rank_with(&engine, "u1", "Incumbent", Tier::Ok, |_| Verdict::TargetWins).await;
    let step = rank_with(&engine, "u1", "Challenger", Tier::Ok, |_| Verdict::TargetWins).await;

    let list = engine.list_view("u1").await.unwrap();
    assert_eq!(list[0].item.film.title, "Challenger");
    assert!((list[0].item.entry.rating - 1512.0).abs() < 1e-9);
    assert!((list[1].item.entry.rating - 1488.0).abs() < 1e-9);

    let history = engine.comparison_history("u1", 50).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].winner_film_id, step.view.target().film.id);
}

#[tokio::test]
async fn test_stale_candidate_verdict_is_ignored() {
    let engine = engine().await;
    for title in ["B", "C"] {
        rank_with(&engine, "u1", title, Tier::Ok, |_| Verdict::CandidateWins).await;
    }

    let entry = add(&engine, "u1", "A").await;
    let step = engine.set_tier("u1", entry, Tier::Ok, None).await.unwrap();
    let session = step.session;
    let before = engine.comparison_history("u1", 50).await.unwrap().len();

    let replay = engine
        .submit_verdict("u1", entry, Verdict::TargetWins, Uuid::new_v4(), session)
        .await
        .unwrap();
    assert_eq!(replay.session, session);
    assert_eq!(engine.comparison_history("u1", 50).await.unwrap().len(), before);
}

#[tokio::test]
async fn test_verdict_without_session_asks_for_tier() {
    let engine = engine().await;
    let entry = add(&engine, "u1", "Lonely").await;

    let step = engine
        .submit_verdict("u1", entry, Verdict::TargetWins, Uuid::new_v4(), None)
        .await
        .unwrap();
    assert!(matches!(step.view, SessionView::AwaitingTier { .. }));
    assert!(step.session.is_none());

    let start = engine.start_ranking("u1", entry, None).await.unwrap();
    assert!(matches!(start.view, SessionView::AwaitingTier { .. }));
}

#[tokio::test]
async fn test_session_for_other_entry_is_discarded() {
    let engine = engine().await;
    rank_with(&engine, "u1", "Existing", Tier::Ok, |_| Verdict::TargetWins).await;
    let first = add(&engine, "u1", "First").await;
    let second = add(&engine, "u1", "Second").await;

    let step = engine.set_tier("u1", first, Tier::Ok, None).await.unwrap();
    assert!(step.session.is_some());

    let resumed = engine.start_ranking("u1", second, step.session).await.unwrap();
    assert!(matches!(resumed.view, SessionView::AwaitingTier { .. }));
    assert!(resumed.session.is_none());

    let resumed = engine.start_ranking("u1", first, step.session).await.unwrap();
    assert!(matches!(resumed.view, SessionView::Comparing { .. }));
}

#[tokio::test]
async fn test_invalid_tier_rejected() {
    let engine = engine().await;
    let entry = add(&engine, "u1", "Film").await;

    let err = engine.set_tier("u1", entry, Tier::Unset, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTier(_)));
    let err = engine.set_tier_str("u1", entry, "great", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTier(_)));

    let step = engine.set_tier_str("u1", entry, " Liked ", None).await.unwrap();
    assert!(matches!(step.view, SessionView::Finalized { tier: Tier::Liked, .. }));
}

#[tokio::test]
async fn test_remove_shifts_and_clears_comparisons() {
    let engine = engine().await;
    for title in ["A", "B", "C", "D", "E"] {
        rank_with(&engine, "u1", title, Tier::Ok, |_| Verdict::CandidateWins).await;
    }
    let list = engine.list_view("u1").await.unwrap();
    let removed = &list[2].item;

    engine.remove_entry("u1", removed.entry.id).await.unwrap();

    assert_eq!(titles(&engine, "u1").await, vec!["A", "B", "D", "E"]);
    let positions: Vec<i64> = engine
        .list_view("u1")
        .await
        .unwrap()
        .iter()
        .map(|e| e.item.entry.position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);

    let history = engine.comparison_history("u1", 100).await.unwrap();
    assert!(history
        .iter()
        .all(|c| c.winner_film_id != removed.film.id && c.loser_film_id != removed.film.id));

    let err = engine.remove_entry("u1", removed.entry.id).await.unwrap_err();
    assert!(matches!(err, Error::EntryNotFound(_)));
}

#[tokio::test]
async fn test_lists_are_isolated_per_user() {
    let engine = engine().await;
    let entry = add(&engine, "u1", "Shared").await;
    add(&engine, "u2", "Shared").await;

    let err = engine.set_tier("u2", entry, Tier::Liked, None).await.unwrap_err();
    assert!(matches!(err, Error::EntryNotFound(_)));
    assert_eq!(titles(&engine, "u2").await, vec!["Shared"]);
}

#[tokio::test]
async fn test_adding_same_catalog_film_twice_reuses_entry() {
    let engine = engine().await;
    let heat = CatalogFilm {
        tmdb_id: 949,
        title: "Heat".to_string(),
        year: Some(1995),
        ..CatalogFilm::default()
    };

    let first = engine.add_catalog_film("u1", &heat).await.unwrap();
    let second = engine.add_catalog_film("u1", &heat).await.unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.item.entry.id, second.item.entry.id);

    let other = engine.add_catalog_film("u2", &heat).await.unwrap();
    assert!(other.created);
    assert_eq!(other.item.film.id, first.item.film.id);
}

#[tokio::test]
async fn test_custom_rating_params() {
    let pool = init_memory_database().await.unwrap();
    let engine = RankingEngine::new(pool, RatingParams { k: 32.0, scale: 400.0 });
    rank_with(&engine, "u1", "One", Tier::Ok, |_| Verdict::TargetWins).await;
    rank_with(&engine, "u1", "Two", Tier::Ok, |_| Verdict::TargetWins).await;

    let list = engine.list_view("u1").await.unwrap();
    assert!((list[0].item.entry.rating - 1516.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_liked_scores_are_stable_across_reads() {
    let engine = engine().await;
    let order = ["First", "Second", "Third", "Fourth"];
    for title in order {
        rank_with(&engine, "u1", title, Tier::Liked, |_| Verdict::CandidateWins).await;
    }

    let first = engine.list_view("u1").await.unwrap();
    let second = engine.list_view("u1").await.unwrap();
    assert_eq!(first, second);

    let scores: Vec<Option<f64>> = first.iter().map(|e| e.display_score).collect();
    assert_eq!(scores, vec![Some(10.0), Some(8.89), Some(7.78), Some(6.67)]);
    assert_eq!(titles(&engine, "u1").await, order);
}

#[tokio::test]
async fn test_failed_final_placement_leaves_verdict_unapplied() {
    let engine = engine().await;
    rank_with(&engine, "u1", "Incumbent", Tier::Ok, |_| Verdict::TargetWins).await;

    let entry = add(&engine, "u1", "Challenger").await;
    let step = engine.set_tier("u1", entry, Tier::Ok, None).await.unwrap();
    let SessionView::Comparing { candidate, .. } = &step.view else {
        panic!("expected a comparison");
    };
    let shown = candidate.entry.id;
    let session = step.session;

    // One verdict ends the search, so the tier write of the placement fails
    sqlx::query(&format!(
        "CREATE TRIGGER fail_tier_write BEFORE UPDATE OF tier ON list_entries
         WHEN NEW.id = '{}'
         BEGIN SELECT RAISE(ABORT, 'simulated storage fault'); END",
        entry
    ))
    .execute(engine.pool())
    .await
    .unwrap();

    for _ in 0..2 {
        let err = engine
            .submit_verdict("u1", entry, Verdict::TargetWins, shown, session)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    assert!(engine.comparison_history("u1", 50).await.unwrap().is_empty());
    let list = engine.list_view("u1").await.unwrap();
    assert!(list.iter().all(|e| e.item.entry.rating == 1500.0));
    assert_eq!(titles(&engine, "u1").await, vec!["Incumbent", "Challenger"]);

    sqlx::query("DROP TRIGGER fail_tier_write")
        .execute(engine.pool())
        .await
        .unwrap();

    let step = engine
        .submit_verdict("u1", entry, Verdict::TargetWins, shown, session)
        .await
        .unwrap();
    assert!(matches!(step.view, SessionView::Finalized { rank_in_tier: 0, .. }));
    assert_eq!(engine.comparison_history("u1", 50).await.unwrap().len(), 1);

    let list = engine.list_view("u1").await.unwrap();
    assert_eq!(list[0].item.entry.id, entry);
    assert!((list[0].item.entry.rating - 1512.0).abs() < 1e-9);
    assert!((list[1].item.entry.rating - 1488.0).abs() < 1e-9);
}

/// Tier and verdicts chosen by `rng`, always answering the candidate shown
async fn place_randomly(engine: &RankingEngine, user: &str, entry: Uuid, rng: &mut StdRng) {
    let tier = [Tier::Liked, Tier::Ok, Tier::Disliked][rng.gen_range(0..3)];
    let mut step = engine.set_tier(user, entry, tier, None).await.unwrap();
    while let SessionView::Comparing { candidate, .. } = &step.view {
        let verdict = if rng.gen_bool(0.5) {
            Verdict::TargetWins
        } else {
            Verdict::CandidateWins
        };
        let shown = candidate.entry.id;
        step = engine
            .submit_verdict(user, entry, verdict, shown, step.session)
            .await
            .unwrap();
    }
    assert!(matches!(step.view, SessionView::Finalized { .. }));
}

async fn assert_dense_tier_major(engine: &RankingEngine, user: &str) {
    let list = engine.list_view(user).await.unwrap();
    let positions: Vec<i64> = list.iter().map(|e| e.item.entry.position).collect();
    assert_eq!(positions, (0..list.len() as i64).collect::<Vec<_>>());

    let tiers: Vec<Tier> = list.iter().map(|e| e.item.entry.tier).collect();
    assert!(
        tiers.windows(2).all(|pair| pair[0] <= pair[1]),
        "tiers interleaved: {:?}",
        tiers
    );
}

#[tokio::test]
async fn test_random_edits_keep_positions_dense_and_tiers_grouped() {
    for seed in [1, 7, 42] {
        let engine = engine().await;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut added = 0;

        for _ in 0..40 {
            let list = engine.list_view("u1").await.unwrap();
            let roll = rng.gen_range(0..10);

            if !list.is_empty() && roll < 3 {
                let victim = list[rng.gen_range(0..list.len())].item.entry.id;
                engine.remove_entry("u1", victim).await.unwrap();
            } else if !list.is_empty() && roll < 5 {
                let entry = list[rng.gen_range(0..list.len())].item.entry.id;
                place_randomly(&engine, "u1", entry, &mut rng).await;
            } else {
                added += 1;
                let entry = add(&engine, "u1", &format!("Film {}", added)).await;
                // Some entries stay unranked at the tail
                if rng.gen_bool(0.8) {
                    place_randomly(&engine, "u1", entry, &mut rng).await;
                }
            }

            assert_dense_tier_major(&engine, "u1").await;
        }
    }
}
