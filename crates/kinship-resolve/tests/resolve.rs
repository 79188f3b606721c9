//! Tier ordering and result-shape tests for `FamilyResolver`.

mod common;

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use kinship_core::{
    CitizenId, CitizenRecord, FamilyGraphResult, Gender, RelationshipEdge, RelationshipSource, RelationshipType,
    ResolutionTier,
};
use kinship_graph::FamilyNetwork;
use kinship_resolve::ResolveError;

use common::{citizen, edge, node, test_config, Harness};

fn cached(
    from: CitizenId,
    to: CitizenId,
    label: &str,
    confidence: u8,
    ttl: TimeDelta,
) -> RelationshipEdge {
    let now = Utc::now();
    RelationshipEdge {
        from_citizen_id: from,
        to_citizen_id: to,
        relationship_type: RelationshipType::Sibling,
        label: label.to_string(),
        confidence,
        verified: false,
        source: RelationshipSource::Graph,
        depth: 1,
        synced_at: now,
        expires_at: Some(now + ttl),
    }
}

fn relationships(result: &FamilyGraphResult) -> Vec<(&str, u8)> {
    result
        .members
        .iter()
        .map(|m| (m.relationship.as_str(), m.confidence))
        .collect()
}

#[tokio::test]
async fn test_graph_hit_skips_cache_and_heuristics() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 38, "12 MG Road");
    let c = citizen("Chandu", Gender::Male, 12, "12 MG Road");
    let h = Harness::new(vec![a.clone(), b.clone(), c.clone()]);
    h.graph.answer(
        a.id.to_string(),
        FamilyNetwork {
            nodes: vec![node(1, &a), node(2, &b), node(3, &c)],
            edges: vec![edge(1, 2, "SPOUSE", Some(0.9)), edge(1, 3, "CHILD", None)],
        },
    );

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Graph);
    assert_eq!(result.member_count(), 3);
    assert_eq!(result.links.len(), 2);
    assert_eq!(
        relationships(&result),
        vec![("Self", 100), ("Spouse", 90), ("Child", 85)]
    );
    assert_eq!(h.cache.read_count(), 0);
    assert_eq!(h.citizens.candidate_calls(), 0);
}

#[tokio::test]
async fn test_graph_lookup_falls_back_to_national_id() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 38, "12 MG Road");
    let h = Harness::new(vec![a.clone(), b.clone()]);

    let mut spouse = node(2, &b);
    spouse.citizen_id = None;
    h.graph.answer(
        a.national_id.clone().unwrap(),
        FamilyNetwork {
            nodes: vec![node(1, &a), spouse],
            edges: vec![edge(1, 2, "SPOUSE", None)],
        },
    );

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(result.tier, ResolutionTier::Graph);
    assert_eq!(result.members[1].citizen_id, b.id);
    assert_eq!(h.graph.call_count(), 2);
}

#[tokio::test]
async fn test_root_only_graph_result_falls_through_in_order() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 38, "12 MG Road");
    let h = Harness::new(vec![a.clone(), b.clone()]);
    h.graph.answer(
        a.id.to_string(),
        FamilyNetwork {
            nodes: vec![node(1, &a)],
            edges: vec![],
        },
    );

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Heuristic);
    assert_eq!(h.cache.read_count(), 1);
    assert!(h.citizens.candidate_calls() >= 1);
    assert_eq!(relationships(&result), vec![("Self", 100), ("Spouse", 85)]);
}

#[tokio::test]
async fn test_unavailable_graph_is_not_an_error() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let h = Harness::new(vec![a.clone()]);
    h.graph.set_unavailable(true);

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Heuristic);
    assert_eq!(relationships(&result), vec![("Self", 100)]);
}

#[tokio::test]
async fn test_disabled_graph_is_never_queried() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let mut config = test_config();
    config.neo4j.enabled = false;
    let h = Harness::with_config(vec![a.clone()], config);

    h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(h.graph.call_count(), 0);
}

#[tokio::test]
async fn test_cache_tier_uses_live_rows_and_skips_heuristics() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let sister = citizen("Sita", Gender::Female, 36, "4 Lake View");
    let stale = citizen("Ravi", Gender::Male, 44, "9 Hill St");
    let h = Harness::new(vec![a.clone(), sister.clone(), stale.clone()]);
    h.cache
        .inner
        .seed([
            cached(a.id, sister.id, "Sibling", 77, TimeDelta::hours(1)),
            cached(a.id, stale.id, "Sibling", 90, TimeDelta::hours(-1)),
        ])
        .await;

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Cache);
    assert_eq!(relationships(&result), vec![("Self", 100), ("Sibling", 77)]);
    assert_eq!(result.members[1].name, "Sita");
    assert_eq!(result.links.len(), 1);
    assert_eq!(h.citizens.candidate_calls(), 0);
}

#[tokio::test]
async fn test_cache_rows_for_unknown_citizens_fall_through() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let h = Harness::new(vec![a.clone()]);
    h.cache
        .inner
        .seed([cached(a.id, CitizenId::new(), "Sibling", 80, TimeDelta::hours(1))])
        .await;

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(result.tier, ResolutionTier::Heuristic);
}

#[tokio::test]
async fn test_heuristic_spouse_and_child() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 37, "12 MG Road");
    let c = citizen("Chandu", Gender::Male, 15, "12 MG Road");
    let h = Harness::new(vec![a.clone(), b.clone(), c.clone()]);

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Heuristic);
    assert_eq!(
        relationships(&result),
        vec![("Self", 100), ("Spouse", 85), ("Child", 80)]
    );
    let links: Vec<_> = result
        .links
        .iter()
        .map(|l| (l.from, l.to, l.relationship.as_str(), l.confidence))
        .collect();
    assert_eq!(
        links,
        vec![
            (a.id, b.id, "Spouse", 85),
            (a.id, c.id, "Parent", 80),
            (b.id, c.id, "Parent", 80),
        ]
    );
}

#[tokio::test]
async fn test_district_only_neighbours_are_bounded() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let mut records = vec![a.clone()];
    for i in 0..20 {
        let mut r = citizen(&format!("N{i:02}"), Gender::Male, 30 + i, &format!("{i} Farm Rd"));
        r.city = "Machilipatnam".to_string();
        records.push(r);
    }
    let h = Harness::new(records);

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert!(result.member_count() <= 8);
    assert!(result.members[0].is_self());
    assert!(result.members[1..]
        .iter()
        .all(|m| m.relationship == "Family Member" && m.confidence == 50));
}

#[tokio::test]
async fn test_large_graph_is_capped_with_self_first() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let mut records = vec![a.clone()];
    let mut nodes = vec![node(0, &a)];
    let mut edges = Vec::new();
    for i in 1..=12 {
        let r = citizen(&format!("R{i:02}"), Gender::Female, 30, "elsewhere");
        nodes.push(node(i, &r));
        edges.push(edge(0, i, "SIBLING", Some(i as f64 / 20.0)));
        records.push(r);
    }
    let h = Harness::new(records);
    h.graph.answer(a.id.to_string(), FamilyNetwork { nodes, edges });

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.member_count(), 8);
    assert!(result.members[0].is_self());
    assert_eq!(result.members[1].confidence, 60);
    assert_eq!(result.links.len(), 7);
    assert!(result
        .links
        .iter()
        .all(|l| result.contains(&l.from) && result.contains(&l.to)));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 37, "12 MG Road");
    let c = citizen("Chandu", Gender::Male, 15, "12 MG Road");
    let d = citizen("Divya", Gender::Female, 9, "12 MG Road");
    let h = Harness::new(vec![a.clone(), b, c, d]);

    let first = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    let second = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_citizen_is_not_found() {
    let h = Harness::new(vec![]);
    let missing = CitizenId::new();

    let err = h.resolver.resolve_family_graph(&missing, 2).await.unwrap_err();
    assert!(matches!(err, ResolveError::CitizenNotFound(id) if id == missing));
}

/// Harness for root A whose graph store reports spouse B, with background
/// sync switched on.
fn syncing_harness() -> (Harness, CitizenRecord, CitizenRecord) {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let b = citizen("Bhavana", Gender::Female, 38, "12 MG Road");
    let mut config = test_config();
    config.resolution.sync_on_resolve = true;
    let h = Harness::with_config(vec![a.clone(), b.clone()], config);
    h.graph.answer(
        a.id.to_string(),
        FamilyNetwork {
            nodes: vec![node(1, &a), node(2, &b)],
            edges: vec![edge(1, 2, "SPOUSE", Some(0.9))],
        },
    );
    (h, a, b)
}

#[tokio::test]
async fn test_graph_hit_syncs_cache_in_background() {
    let (h, a, b) = syncing_harness();

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(result.tier, ResolutionTier::Graph);
    h.resolver.drain_background().await;

    let rows = h.cache.inner.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_citizen_id, b.id);
    assert_eq!(rows[0].source, RelationshipSource::Graph);
}

#[test]
fn test_background_sync_survives_runtime_shutdown_after_drain() {
    let (h, a, b) = syncing_harness();
    h.graph.set_latency(Duration::from_millis(30));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let tier = rt.block_on(async {
        let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
        h.resolver.drain_background().await;
        result.tier
    });
    drop(rt);

    assert_eq!(tier, ResolutionTier::Graph);
    let rows = tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(h.cache.inner.snapshot());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_citizen_id, b.id);
}

#[tokio::test]
async fn test_resolution_does_not_wait_for_background_sync() {
    let (h, a, _) = syncing_harness();

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    // Current-thread runtime: the spawned sync has not been polled yet.
    assert_eq!(result.tier, ResolutionTier::Graph);
    assert!(h.cache.inner.snapshot().await.is_empty());
    h.resolver.drain_background().await;
    assert_eq!(h.cache.inner.snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_cache_rows_pointing_back_at_root_are_ignored() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let sister = citizen("Sita", Gender::Female, 36, "4 Lake View");
    let h = Harness::new(vec![a.clone(), sister.clone()]);
    h.cache
        .inner
        .seed([
            cached(a.id, a.id, "Sibling", 99, TimeDelta::hours(1)),
            cached(a.id, sister.id, "Sibling", 77, TimeDelta::hours(1)),
        ])
        .await;

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();

    assert_eq!(result.tier, ResolutionTier::Cache);
    assert_eq!(result.member_count(), 2);
    assert_eq!(result.links.len(), 1);
    assert!(result.links.iter().all(|l| l.from != l.to));
}

#[tokio::test]
async fn test_only_self_referencing_cache_rows_fall_through() {
    let a = citizen("Arjun", Gender::Male, 40, "12 MG Road");
    let h = Harness::new(vec![a.clone()]);
    h.cache
        .inner
        .seed([cached(a.id, a.id, "Sibling", 99, TimeDelta::hours(1))])
        .await;

    let result = h.resolver.resolve_family_graph(&a.id, 2).await.unwrap();
    assert_eq!(result.tier, ResolutionTier::Heuristic);
    assert!(result.links.is_empty());
}
