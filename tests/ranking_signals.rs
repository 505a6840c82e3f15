use chrono::{DateTime, TimeZone, Utc};
use guidance_core::config::ScoringWeights;
use guidance_core::corpus::Excerpt;
use guidance_core::selection::{rank_top_k, Scorer, SignalScorer};
use guidance_core::types::{DiffSummary, RankContext, RequestContext};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn excerpt(id: &str, key: &str, filepath: &str) -> Excerpt {
    Excerpt {
        id: id.to_string(),
        key: key.to_string(),
        text: format!("{id} text"),
        filepath: filepath.to_string(),
        start_line: 1,
        end_line: 2,
        tags: None,
        last_modified: None,
        commit: None,
        owner: None,
        non_compressible: false,
        score_features: None,
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn score(ex: &Excerpt, request: &RequestContext) -> f64 {
    let scorer = SignalScorer::default();
    let ctx = RankContext { request, now: now() };
    scorer.score_value(&scorer.score(ex, &ctx))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn no_signals_score_zero() {
    let ex = excerpt("e1", "a", "ea/policies/log.md");
    assert_eq!(score(&ex, &RequestContext::new("review")), 0.0);
}

#[test]
fn tag_overlap_counts_each_distinct_label() {
    let mut ex = excerpt("e1", "a", "ea/doc.md");
    ex.tags = Some(vec!["api".into(), "Security".into(), "other".into()]);

    let request = RequestContext::new("review").with_labels(["API", "security"]);
    assert!(approx(score(&ex, &request), 5.0));

    let request = RequestContext::new("review").with_labels(["api", "API"]);
    assert!(approx(score(&ex, &request), 2.5));
}

#[test]
fn path_match_uses_top_level_segment_once() {
    let request = RequestContext::new("review").with_diff(DiffSummary {
        touched_paths: Some(vec!["src/api/todos.ts".into(), "src/db/pool.ts".into()]),
        ..DiffSummary::default()
    });

    assert!(approx(score(&excerpt("e1", "a", "src/readme.md"), &request), 2.0));
    assert_eq!(score(&excerpt("e2", "a", "ea/readme.md"), &request), 0.0);
}

#[test]
fn filetype_match_is_case_insensitive() {
    let request = RequestContext::new("review").with_diff(DiffSummary {
        file_extensions: Some(vec![".TS".into()]),
        ..DiffSummary::default()
    });

    assert!(approx(score(&excerpt("e1", "a", "web/app.Ts"), &request), 1.0));
    assert_eq!(score(&excerpt("e2", "a", "web/Makefile"), &request), 0.0);
    assert_eq!(score(&excerpt("e3", "a", "web/app.tsx"), &request), 0.0);
}

#[test]
fn recency_boost_within_180_days() {
    let request = RequestContext::new("review");

    let mut recent = excerpt("e1", "a", "doc.md");
    recent.last_modified = Some("2024-03-01".into());
    assert!(approx(score(&recent, &request), 0.5));

    let mut timestamped = excerpt("e2", "a", "doc.md");
    timestamped.last_modified = Some("2024-05-01T10:00:00Z".into());
    assert!(approx(score(&timestamped, &request), 0.5));

    let mut stale = excerpt("e3", "a", "doc.md");
    stale.last_modified = Some("2023-01-01".into());
    assert_eq!(score(&stale, &request), 0.0);

    let mut garbage = excerpt("e4", "a", "doc.md");
    garbage.last_modified = Some("last tuesday".into());
    assert_eq!(score(&garbage, &request), 0.0);
}

#[test]
fn owner_trust_matches_arch_or_platform() {
    let request = RequestContext::new("review");

    let mut platform = excerpt("e1", "a", "doc.md");
    platform.owner = Some("Platform Team".into());
    assert!(approx(score(&platform, &request), 0.4));

    let mut architects = excerpt("e2", "a", "doc.md");
    architects.owner = Some("ARCHITECTURE-board".into());
    assert!(approx(score(&architects, &request), 0.4));

    let mut core = excerpt("e3", "a", "doc.md");
    core.owner = Some("core".into());
    assert_eq!(score(&core, &request), 0.0);
}

#[test]
fn all_signals_add_up() {
    let mut ex = excerpt("e1", "a", "src/api/handler.ts");
    ex.tags = Some(vec!["api".into()]);
    ex.last_modified = Some("2024-05-20".into());
    ex.owner = Some("platform".into());

    let request = RequestContext::new("review")
        .with_labels(["api"])
        .with_diff(DiffSummary {
            touched_paths: Some(vec!["src/api/todos.ts".into()]),
            file_extensions: Some(vec![".ts".into()]),
            message: Some("scaffold POST /todos".into()),
        });

    assert!(approx(score(&ex, &request), 6.4));
}

#[test]
fn configured_weights_replace_defaults() {
    let weights = ScoringWeights {
        tag_overlap: 10.0,
        ..ScoringWeights::default()
    };
    let scorer = SignalScorer::new(weights);

    let mut ex = excerpt("e1", "a", "doc.md");
    ex.tags = Some(vec!["api".into()]);
    ex.owner = Some("platform".into());

    let request = RequestContext::new("review").with_labels(["api"]);
    let ctx = RankContext { request: &request, now: now() };
    let details = scorer.score(&ex, &ctx);

    assert!(approx(details.tag_overlap, 10.0));
    assert!(approx(details.owner_trust, 0.4));
    assert!(approx(scorer.score_value(&details), 10.4));
}

#[test]
fn top_k_per_bucket() {
    let excerpts = vec![
        excerpt("e1", "constraints/policies", "ea/policies/log.md"),
        excerpt("e2", "architecture/views", "solution/views/backend.md"),
    ];
    let request = RequestContext::new("design_review").with_labels(["api"]);
    let ctx = RankContext { request: &request, now: now() };
    let selected = keys(&["constraints/policies", "architecture/views"]);

    let ranked = rank_top_k(&SignalScorer::default(), &excerpts, &ctx, &selected, 1);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked.bucket("constraints/policies")[0].excerpt.id, "e1");
    assert_eq!(ranked.bucket("architecture/views")[0].excerpt.id, "e2");
}

#[test]
fn ties_keep_input_order_and_truncate() {
    let mut boosted = excerpt("e4", "a", "doc.md");
    boosted.owner = Some("platform".into());
    let excerpts = vec![
        excerpt("e1", "a", "doc.md"),
        excerpt("e2", "a", "doc.md"),
        excerpt("e3", "a", "doc.md"),
        boosted,
    ];
    let request = RequestContext::new("review");
    let ctx = RankContext { request: &request, now: now() };
    let selected = keys(&["a"]);

    let ranked = rank_top_k(&SignalScorer::default(), &excerpts, &ctx, &selected, 3);
    let ids: Vec<&str> = ranked.iter().map(|s| s.excerpt.id.as_str()).collect();
    assert_eq!(ids, vec!["e4", "e1", "e2"]);

    let again = rank_top_k(&SignalScorer::default(), &excerpts, &ctx, &selected, 3);
    let again_ids: Vec<&str> = again.iter().map(|s| s.excerpt.id.as_str()).collect();
    assert_eq!(ids, again_ids);
}

#[test]
fn buckets_follow_priority_and_discard_unselected() {
    let excerpts = vec![
        excerpt("a1", "a", "doc.md"),
        excerpt("b1", "b", "doc.md"),
        excerpt("z1", "z", "doc.md"),
    ];
    let request = RequestContext::new("review");
    let ctx = RankContext { request: &request, now: now() };
    let selected = keys(&["b", "missing", "a"]);

    let ranked = rank_top_k(&SignalScorer::default(), &excerpts, &ctx, &selected, 5);

    let order: Vec<&str> = ranked.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(order, vec!["b", "missing", "a"]);
    assert!(ranked.bucket("missing").is_empty());
    assert!(ranked.bucket("z").is_empty());

    let ids: Vec<&str> = ranked.iter().map(|s| s.excerpt.id.as_str()).collect();
    assert_eq!(ids, vec!["b1", "a1"]);
}

#[test]
fn small_weight_sums_rank_without_rounding_ties() {
    let weights = ScoringWeights {
        tag_overlap: 0.1,
        path_match: 0.2,
        filetype_match: 0.3,
        ..ScoringWeights::default()
    };
    let filetype_only = excerpt("filetype", "a", "docs/guide.ts");
    let mut tag_and_path = excerpt("tag_path", "a", "src/notes.md");
    tag_and_path.tags = Some(vec!["api".into()]);
    let excerpts = vec![filetype_only, tag_and_path];

    let request = RequestContext::new("review")
        .with_labels(["api"])
        .with_diff(DiffSummary {
            touched_paths: Some(vec!["src/api/todos.ts".into()]),
            file_extensions: Some(vec![".ts".into()]),
            message: None,
        });
    let ctx = RankContext { request: &request, now: now() };

    let ranked = rank_top_k(&SignalScorer::new(weights), &excerpts, &ctx, &keys(&["a"]), 2);
    let ids: Vec<&str> = ranked.iter().map(|s| s.excerpt.id.as_str()).collect();
    // 0.1 + 0.2 sums just above 0.3.
    assert_eq!(ids, vec!["tag_path", "filetype"]);
    assert!(ranked.bucket("a")[0].score > ranked.bucket("a")[1].score);
}
