use guidance_core::config::Manifest;
use guidance_core::corpus::Excerpt;
use guidance_core::types::{
    BudgetReport, Citation, DebugInfo, GuidanceResponse, RequestContext, SnapshotVersion,
};

fn excerpt() -> Excerpt {
    Excerpt {
        id: "ex1".to_string(),
        key: "constraints/policies".to_string(),
        text: "All calls must be logged.".to_string(),
        filepath: "ea/policies/logging.md".to_string(),
        start_line: 1,
        end_line: 2,
        tags: Some(vec!["constraint".to_string()]),
        last_modified: None,
        commit: Some("abc123".to_string()),
        owner: None,
        non_compressible: true,
        score_features: None,
    }
}

#[test]
fn golden_response_serialization() {
    let ex = excerpt();
    let response = GuidanceResponse {
        kernels: vec![],
        citations: vec![Citation::from(&ex)],
        excerpts: vec![ex],
        budget: BudgetReport {
            supplied_tokens: 7,
            cap_tokens: 400,
            reserved_for_reasoning: 100,
        },
        debug: DebugInfo {
            selected_keys: vec!["constraints/policies".to_string()],
            dropped_keys: vec![],
            snapshot_version: SnapshotVersion::from_parts([b"fixture".as_slice()]),
        },
    };

    let json = serde_json::to_string_pretty(&response).unwrap();

    let kernels = json.find("\"kernels\":").unwrap();
    let excerpts = json.find("\"excerpts\":").unwrap();
    let citations = json.find("\"citations\":").unwrap();
    let budget = json.find("\"budget\":").unwrap();
    let debug = json.find("\"debug\":").unwrap();
    assert!(kernels < excerpts && excerpts < citations && citations < budget && budget < debug);

    // Absent optionals are omitted rather than serialized as null.
    assert!(!json.contains("null"));
    assert!(!json.contains("\"owner\""));
    assert!(json.contains("\"non_compressible\": true"));

    let back: GuidanceResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn compressible_excerpt_omits_flag() {
    let mut ex = excerpt();
    ex.non_compressible = false;
    let json = serde_json::to_string(&ex).unwrap();
    assert!(!json.contains("non_compressible"));
}

#[test]
fn excerpt_without_text_defaults_to_empty() {
    let ex: Excerpt = serde_json::from_str(
        r#"{"id":"e","key":"k","filepath":"a/b.md","start_line":1,"end_line":1}"#,
    )
    .unwrap();
    assert_eq!(ex.text, "");
    assert!(!ex.non_compressible);
}

#[test]
fn request_context_accepts_minimal_payload() {
    let ctx: RequestContext = serde_json::from_str(r#"{"task":"design_review"}"#).unwrap();
    assert_eq!(ctx.task, "design_review");
    assert!(ctx.diff_summary.is_none());
    assert!(ctx.touched_paths().is_empty());
    assert!(ctx.label_set().is_empty());
}

#[test]
fn manifest_defaults_resolve_in_order() {
    let manifest = Manifest::from_yaml(
        r#"
globals:
  supply_hard_cap_tokens: 1000
  reserve_for_reasoning: 200
  default_topk_per_key: 4
scoring:
  weights:
    path_match: 3.0
keys:
  b:
    max_tokens: 50
    compressible: false
  a:
triggers:
  tasks:
    focused:
      include_keys: [a, b, a]
      topk_per_key: 1
"#,
    )
    .unwrap();

    assert_eq!(manifest.weights().path_match, 3.0);
    assert_eq!(manifest.weights().tag_overlap, 2.5);
    assert_eq!(manifest.target_ratio(), 0.45);

    let all = manifest.select_task("other");
    assert_eq!(all.keys, vec!["b", "a"]);
    assert_eq!(all.topk, 4);
    assert_eq!(all.cap_tokens, 1000);

    let focused = manifest.select_task("focused");
    assert_eq!(focused.keys, vec!["a", "b"]);
    assert_eq!(focused.topk, 1);

    let policy = manifest.budget_policy(focused.cap_tokens);
    assert_eq!(policy.effective_cap(), 800);
    assert_eq!(policy.bucket_cap("b", 2), 50);
    assert_eq!(policy.bucket_cap("a", 2), 400);
    assert!(!policy.is_compressible("b"));
    assert!(policy.is_compressible("a"));
}
